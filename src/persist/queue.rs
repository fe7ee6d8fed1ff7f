//! Background save queue
//!
//! Mutations hand the queue a full state snapshot. A single worker task
//! writes the latest snapshot after a short debounce, so bursts of edits
//! collapse into one write and the newest state always wins. Failed writes
//! are retried with a linear backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::backend::StorageBackend;
use super::state::{PersistError, PersistedState};

/// Timing for the save worker
#[derive(Debug, Clone)]
pub struct SaveQueueConfig {
    pub debounce: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for SaveQueueConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            max_retries: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// Progress reported by the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// Highest revision written successfully
    pub persisted: u64,
    /// Revision whose write gave up after all retries, cleared on the next success
    pub failed: Option<u64>,
}

type Pending = Option<Arc<PersistedState>>;

pub struct SaveQueue {
    pending: watch::Sender<Pending>,
    status: watch::Receiver<SaveStatus>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Start the worker on the current tokio runtime
    pub fn spawn(backend: Arc<dyn StorageBackend>, config: SaveQueueConfig) -> Self {
        let (pending, pending_rx) = watch::channel(None);
        let (status_tx, status) = watch::channel(SaveStatus::default());
        let worker = tokio::spawn(run_worker(backend, pending_rx, status_tx, config));
        Self {
            pending,
            status,
            worker,
        }
    }

    /// Queue `state` for writing, replacing anything not yet written
    pub fn request(&self, state: PersistedState) {
        debug!(revision = state.revision, "Queued save");
        self.pending.send_replace(Some(Arc::new(state)));
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    fn requested_revision(&self) -> u64 {
        self.pending
            .borrow()
            .as_ref()
            .map(|state| state.revision)
            .unwrap_or(0)
    }

    /// Wait until the most recently requested state has been written
    pub async fn flush(&self) -> Result<u64, PersistError> {
        let target = self.requested_revision();
        wait_for(self.status.clone(), target).await
    }

    /// Write anything pending, then stop the worker
    pub async fn shutdown(self) -> Result<(), PersistError> {
        let target = self.requested_revision();
        let SaveQueue {
            pending,
            status,
            worker,
        } = self;
        drop(pending);
        worker
            .await
            .map_err(|e| PersistError::Storage(format!("save worker panicked: {}", e)))?;

        let last = *status.borrow();
        if last.persisted >= target {
            info!(revision = last.persisted, "Save queue stopped");
            Ok(())
        } else {
            Err(PersistError::SaveFailed { revision: target })
        }
    }
}

async fn wait_for(
    mut status: watch::Receiver<SaveStatus>,
    target: u64,
) -> Result<u64, PersistError> {
    loop {
        let current = *status.borrow_and_update();
        if current.persisted >= target {
            return Ok(current.persisted);
        }
        if let Some(revision) = current.failed.filter(|r| *r >= target) {
            return Err(PersistError::SaveFailed { revision });
        }
        if status.changed().await.is_err() {
            return Err(PersistError::WorkerStopped);
        }
    }
}

async fn run_worker(
    backend: Arc<dyn StorageBackend>,
    mut pending: watch::Receiver<Pending>,
    status: watch::Sender<SaveStatus>,
    config: SaveQueueConfig,
) {
    loop {
        let mut closed = pending.changed().await.is_err();
        if !closed && !config.debounce.is_zero() {
            // Fixed deadline: later requests ride along instead of extending the wait
            let deadline = Instant::now() + config.debounce;
            loop {
                match tokio::time::timeout_at(deadline, pending.changed()).await {
                    Ok(Ok(())) => continue,
                    Ok(Err(_)) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }
        }

        let latest = pending.borrow_and_update().clone();
        if let Some(state) = latest {
            if state.revision > status.borrow().persisted {
                save_with_retry(backend.as_ref(), &state, &status, &config).await;
            }
        }

        if closed {
            break;
        }
    }
}

async fn save_with_retry(
    backend: &dyn StorageBackend,
    state: &PersistedState,
    status: &watch::Sender<SaveStatus>,
    config: &SaveQueueConfig,
) {
    let revision = state.revision;
    let mut attempt = 0;
    loop {
        match backend.save(state).await {
            Ok(()) => {
                status.send_modify(|s| {
                    s.persisted = revision;
                    s.failed = None;
                });
                info!(revision, "Saved session state");
                return;
            }
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                warn!(revision, attempt, error = %e, "Save failed, retrying");
                tokio::time::sleep(config.retry_backoff * attempt).await;
            }
            Err(e) => {
                error!(revision, error = %e, "Save failed, giving up");
                status.send_modify(|s| s.failed = Some(revision));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryBackend;

    fn fast() -> SaveQueueConfig {
        SaveQueueConfig {
            debounce: Duration::from_millis(5),
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_flush_writes_latest() {
        let backend = Arc::new(MemoryBackend::new());
        let queue = SaveQueue::spawn(backend.clone(), fast());

        for revision in 1..=5 {
            queue.request(PersistedState::new("KJV", revision));
        }
        assert_eq!(queue.flush().await.unwrap(), 5);
        assert_eq!(backend.stored().unwrap().revision, 5);
        // Bursts collapse into fewer writes than requests
        assert!(backend.save_count() < 5);
        queue.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_next(2);
        let queue = SaveQueue::spawn(backend.clone(), fast());

        queue.request(PersistedState::new("KJV", 1));
        assert_eq!(queue.flush().await.unwrap(), 1);
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_reports_exhausted_retries() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_next(10);
        let queue = SaveQueue::spawn(backend.clone(), fast());

        queue.request(PersistedState::new("KJV", 1));
        assert!(matches!(
            queue.flush().await,
            Err(PersistError::SaveFailed { revision: 1 })
        ));
        assert_eq!(queue.status().failed, Some(1));
    }

    #[tokio::test]
    async fn test_shutdown_writes_pending_state() {
        let backend = Arc::new(MemoryBackend::new());
        let queue = SaveQueue::spawn(
            backend.clone(),
            SaveQueueConfig {
                debounce: Duration::from_secs(60),
                ..fast()
            },
        );
        queue.request(PersistedState::new("KJV", 3));
        queue.shutdown().await.unwrap();
        assert_eq!(backend.stored().unwrap().revision, 3);
    }

    #[tokio::test]
    async fn test_flush_with_nothing_queued() {
        let queue = SaveQueue::spawn(Arc::new(MemoryBackend::new()), fast());
        assert_eq!(queue.flush().await.unwrap(), 0);
    }
}
