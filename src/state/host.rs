use crate::entity::SensorEntity;
use anyhow::Result;
use async_trait::async_trait;

/// Entity registry and state propagation provided by the host platform.
///
/// Schedulers register their entities once at setup and then call
/// `update_state` for every entity whose value changed in a cycle.
#[async_trait]
pub trait EntityHost: Send + Sync {
    /// Registers entities created during setup.
    ///
    /// The host owns the ID namespace: an entity whose ID is already taken
    /// is registered under a suffixed ID (`_2`, `_3`, ...) and its
    /// `entity_id` is rewritten so later `update_state` calls hit its slot.
    fn add_entities(&self, entities: &mut [SensorEntity]);

    /// Publishes the current state of a single entity.
    async fn update_state(&self, entity: &SensorEntity) -> Result<()>;
}
