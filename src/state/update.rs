use crate::entity::SensorValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State update message broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateUpdate {
    pub entity_id: String,
    pub old_state: Option<SensorValue>,
    pub new_state: Option<SensorValue>,
    pub timestamp: DateTime<Utc>,
}
