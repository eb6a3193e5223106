use crate::entity::SensorEntity;
use crate::state::host::EntityHost;
use crate::state::update::StateUpdate;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// In-process host: keeps the last published snapshot of every entity and
/// broadcasts state changes to subscribers.
pub struct StateStore {
    /// Lock-free concurrent map keyed by entity_id
    pub(crate) entities: Arc<DashMap<String, SensorEntity>>,

    /// Broadcast channel for state change events
    state_tx: broadcast::Sender<StateUpdate>,
}

impl StateStore {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(1000);

        Self {
            entities: Arc::new(DashMap::new()),
            state_tx,
        }
    }

    /// Get entity by ID
    pub fn get_entity(&self, entity_id: &str) -> Option<SensorEntity> {
        self.entities.get(entity_id).map(|e| e.clone())
    }

    /// Get all entities, sorted by entity_id
    pub fn get_all_entities(&self) -> Vec<SensorEntity> {
        let mut entities: Vec<SensorEntity> =
            self.entities.iter().map(|e| e.value().clone()).collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// Subscribe to state updates
    pub fn subscribe(&self) -> broadcast::Receiver<StateUpdate> {
        self.state_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityHost for StateStore {
    fn add_entities(&self, entities: &mut [SensorEntity]) {
        for entity in entities.iter_mut() {
            let requested = entity.entity_id.clone();
            let mut suffix = 1;
            loop {
                match self.entities.entry(entity.entity_id.clone()) {
                    Entry::Occupied(_) => {
                        suffix += 1;
                        entity.entity_id = format!("{}_{}", requested, suffix);
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(entity.clone());
                        break;
                    }
                }
            }
            if suffix > 1 {
                warn!(
                    requested = %requested,
                    entity_id = %entity.entity_id,
                    "Entity ID already registered, using suffixed ID"
                );
            }
        }
        info!(count = entities.len(), "Entities registered");
    }

    async fn update_state(&self, entity: &SensorEntity) -> Result<()> {
        let mut slot = self
            .entities
            .get_mut(&entity.entity_id)
            .ok_or_else(|| anyhow!("Entity {} is not registered", entity.entity_id))?;

        let old_state = slot.state().cloned();
        *slot = entity.clone();
        drop(slot);

        let update = StateUpdate {
            entity_id: entity.entity_id.clone(),
            old_state,
            new_state: entity.state().cloned(),
            timestamp: entity.last_updated().unwrap_or_else(Utc::now),
        };

        debug!(
            entity_id = %update.entity_id,
            new_state = ?update.new_state,
            "State changed"
        );

        // No subscribers is fine
        let _ = self.state_tx.send(update);

        Ok(())
    }
}
