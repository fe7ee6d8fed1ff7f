use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotations::{Layer, StoredAnnotation};
use crate::collections::SerializedCollection;

/// Version of the persisted state document
pub const STATE_VERSION: u32 = 1;

/// Errors from saving or loading session state
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid saved state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported saved state version {0}")]
    UnsupportedVersion(u32),

    #[error("Saving revision {revision} failed after all retries")]
    SaveFailed { revision: u64 },

    #[error("The save worker has stopped")]
    WorkerStopped,
}

/// Everything a session needs to come back after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    /// Translation the ranges were validated against
    pub translation: String,
    /// Monotonic session revision this state was taken at
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub annotations: Vec<StoredAnnotation>,
    #[serde(default)]
    pub collections: Vec<SerializedCollection>,
}

impl PersistedState {
    pub fn new(translation: &str, revision: u64) -> Self {
        Self {
            version: STATE_VERSION,
            translation: translation.to_string(),
            revision,
            saved_at: Utc::now(),
            layers: Vec::new(),
            annotations: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn check_version(&self) -> Result<(), PersistError> {
        if self.version == STATE_VERSION {
            Ok(())
        } else {
            Err(PersistError::UnsupportedVersion(self.version))
        }
    }
}
