//! Process-wide backend lifecycle.
//!
//! One mounted store per process, shared by every [`crate::Filesystem`]
//! session. The lifecycle is explicit — [`initialize`] / [`shutdown`] — not
//! an implicit first-access global, so tests can reset it deterministically.
//! The latch is a `tokio::sync::Mutex` held across the open, which gives
//! single-flight initialization: concurrent first-time callers all observe
//! the one in-flight open and share its result.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FsError, FsResult};
use crate::store::{SharedStore, Store};

static MOUNT: Mutex<Option<SharedStore>> = Mutex::const_new(None);

/// Where the mounted store lives.
#[derive(Debug, Clone, Default)]
pub struct MountConfig {
    /// SQLite database path, or `None` for an in-memory store.
    pub path: Option<PathBuf>,
}

impl MountConfig {
    /// Persist to a database file on disk.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self { path: None }
    }
}

/// Initialize the process-wide store, or return the existing one.
///
/// Idempotent; a second call ignores its config and returns the store that
/// is already mounted.
pub async fn initialize(config: MountConfig) -> FsResult<SharedStore> {
    let mut mount = MOUNT.lock().await;
    if let Some(store) = mount.as_ref() {
        debug!("mount: already initialized, reusing store");
        return Ok(Arc::clone(store));
    }

    let store = match &config.path {
        Some(path) => {
            info!("mount: opening store at {}", path.display());
            Store::open(path).await?
        }
        None => {
            info!("mount: opening in-memory store");
            Store::in_memory().await?
        }
    };

    *mount = Some(Arc::clone(&store));
    Ok(store)
}

/// The currently mounted store.
pub async fn shared() -> FsResult<SharedStore> {
    MOUNT
        .lock()
        .await
        .as_ref()
        .map(Arc::clone)
        .ok_or(FsError::NotMounted)
}

/// Drop the process-wide store handle.
///
/// Sessions holding their own `SharedStore` clone keep working; this only
/// resets the global so the next [`initialize`] opens fresh. Mainly for
/// tests and orderly teardown.
pub async fn shutdown() {
    let mut mount = MOUNT.lock().await;
    if mount.take().is_some() {
        info!("mount: shut down");
    }
}
