// Host-side entity registry and state propagation

mod engine;
mod host;
mod update;

pub use engine::StateStore;
pub use host::EntityHost;
pub use update::StateUpdate;
