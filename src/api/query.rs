use crate::entity::SensorEntity;
use crate::state::StateStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for the query API
pub struct QueryAppState {
    pub state_store: Arc<StateStore>,
}

/// Query parameters for entity listing
#[derive(Deserialize)]
pub struct EntityQueryParams {
    /// Filter by entity ID prefix (e.g. `sensor.yahoo_precipitation`)
    pub prefix: Option<String>,
}

/// Static attributes exposed next to the state
#[derive(Serialize)]
pub struct EntityAttributes {
    pub friendly_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    pub attribution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_picture: Option<String>,
}

/// Entity state response
#[derive(Serialize)]
pub struct EntityStateResponse {
    pub entity_id: String,
    /// Current value, or `"unknown"` before the first successful fetch
    pub state: serde_json::Value,
    pub attributes: EntityAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl From<SensorEntity> for EntityStateResponse {
    fn from(entity: SensorEntity) -> Self {
        let state = entity
            .state()
            .and_then(|s| serde_json::to_value(s).ok())
            .unwrap_or_else(|| serde_json::Value::String("unknown".to_string()));

        Self {
            attributes: EntityAttributes {
                friendly_name: entity.name.clone(),
                unit_of_measurement: entity.unit.clone(),
                attribution: entity.attribution.clone(),
                entity_picture: entity.entity_picture().map(str::to_string),
            },
            last_updated: entity.last_updated().map(|t| t.to_rfc3339()),
            entity_id: entity.entity_id,
            state,
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
///
/// Read-only, so any origin may call it.
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/api/states", get(list_states))
        .route("/api/states/:entity_id", get(get_state))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/states - List all entities
///
/// Query parameters:
/// - `prefix`: Filter by entity ID prefix (e.g., ?prefix=sensor.jr_west)
async fn list_states(
    State(state): State<Arc<QueryAppState>>,
    Query(params): Query<EntityQueryParams>,
) -> Result<Json<Vec<EntityStateResponse>>, QueryError> {
    let response: Vec<EntityStateResponse> = state
        .state_store
        .get_all_entities()
        .into_iter()
        .filter(|entity| match params.prefix {
            Some(ref prefix) => entity.entity_id.starts_with(prefix),
            None => true,
        })
        .map(EntityStateResponse::from)
        .collect();

    Ok(Json(response))
}

/// GET /api/states/:entity_id - Get specific entity
async fn get_state(
    State(state): State<Arc<QueryAppState>>,
    Path(entity_id): Path<String>,
) -> Result<Json<EntityStateResponse>, QueryError> {
    let entity = state
        .state_store
        .get_entity(&entity_id)
        .ok_or(QueryError::NotFound)?;

    Ok(Json(EntityStateResponse::from(entity)))
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "Entity not found"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}
