// Read-only HTTP view of entity states

pub mod query;

pub use query::{create_query_router, EntityStateResponse, QueryAppState};
