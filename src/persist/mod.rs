//! Persistence
//!
//! Session state (layers, annotations, collections) is saved as one JSON
//! document through a pluggable backend, written off the caller's path by
//! the save queue.

mod backend;
mod queue;
mod state;

pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use queue::{SaveQueue, SaveQueueConfig, SaveStatus};
pub use state::{PersistError, PersistedState, STATE_VERSION};
