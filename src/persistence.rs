//! Persistence bridge: a restart-surviving mirror of the session.
//!
//! DESIGN
//! ======
//! The snapshot is one JSON file named after the `state` storage key. `load`
//! runs once at startup and degrades every failure to the default
//! logged-out state. `save` is best-effort: failures are logged and dropped.
//!
//! `spawn_writer` hooks the bridge onto a store. The observer only enqueues
//! the snapshot on an unbounded channel, so transitions never wait on disk.
//! A background task drains the channel and writes the latest snapshot,
//! skipping any that were superseded while a write was in progress.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::session::store::{SessionStore, SubscriptionId};
use crate::session::types::{SessionState, StoredSession};

/// Well-known storage key for the session snapshot.
pub const STORAGE_KEY: &str = "state";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage io failed: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("snapshot is inconsistent: loggedIn flag disagrees with its token and user")]
    Invalid,
}

#[derive(Debug, Clone)]
pub struct PersistenceBridge {
    path: PathBuf,
}

impl PersistenceBridge {
    /// Bridge storing `<dir>/state.json`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{STORAGE_KEY}.json")) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted snapshot, or the default state if there is none or
    /// it cannot be used.
    #[must_use]
    pub fn load(&self) -> SessionState {
        match self.read() {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::default(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "discarding unreadable session snapshot");
                SessionState::default()
            }
        }
    }

    fn read(&self) -> Result<Option<SessionState>, PersistenceError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSession = serde_json::from_slice(&raw)?;
        stored.into_state().map(Some).ok_or(PersistenceError::Invalid)
    }

    /// Write the snapshot. Failures are logged, never returned.
    pub async fn save(&self, state: &SessionState) {
        if let Err(e) = self.write(state).await {
            error!(error = %e, path = %self.path.display(), "session snapshot write failed");
        }
    }

    async fn write(&self, state: &SessionState) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(&StoredSession::from(state))?;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "session snapshot written");
        Ok(())
    }

    /// Mirror every transition of `store` to disk from a background task.
    ///
    /// Must be called inside a tokio runtime. The task ends once the returned
    /// subscription is removed from the store (dropping the channel sender).
    pub fn spawn_writer(self, store: &SessionStore) -> (SubscriptionId, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<SessionState>>();
        let subscription = store.subscribe(move |state| {
            // Only fails once the writer task is gone.
            let _ = tx.send(state.clone());
        });

        let handle = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                while let Ok(newer) = rx.try_recv() {
                    latest = newer;
                }
                self.save(&latest).await;
            }
        });

        (subscription, handle)
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
