//! Storage backends
//!
//! The vault/file layer is an external collaborator; these two backends are
//! what the binary and the tests use.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::state::{PersistError, PersistedState};

/// Trait for persisted-state storage
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Replace the stored state
    async fn save(&self, state: &PersistedState) -> Result<(), PersistError>;

    /// Load the stored state, `None` if nothing was saved yet
    async fn load(&self) -> Result<Option<PersistedState>, PersistError>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Keeps the last saved state in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<Option<PersistedState>>,
    saves: AtomicUsize,
    /// Number of upcoming saves that should fail
    failures: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail with a storage error
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Option<PersistedState> {
        self.state.lock().clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(PersistError::Storage("simulated failure".to_string()));
        }
        *self.state.lock() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        Ok(self.state.lock().clone())
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Stores the state as a pretty-printed JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), revision = state.revision, "Wrote state file");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let state: PersistedState = serde_json::from_slice(&bytes)?;
                state.check_version()?;
                Ok(Some(state))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
