//! Async storage backend over the synchronous SQLite core.
//!
//! SQLite calls are blocking, so every operation runs on
//! `tokio::task::spawn_blocking` against a shared [`FsDb`] handle. Each call
//! is one backend round trip; independent operations interleave between
//! round trips, which is exactly the concurrency surface the filesystem
//! layer documents.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Result as SqliteResult;

use crate::db::{FileData, FsDb};
use crate::error::FsResult;
use crate::types::{Inode, InodeId};

/// Thread-safe handle to a [`Store`].
pub type SharedStore = Arc<Store>;

/// Async handle to the inode database.
///
/// All sessions ([`crate::Filesystem`] instances) over one mount share a
/// single `Store`, and therefore a single root.
pub struct Store {
    db: Arc<Mutex<FsDb>>,
}

impl Store {
    /// Wrap an already-open database.
    pub fn new(db: FsDb) -> SharedStore {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open or create an on-disk store.
    pub async fn open(path: impl AsRef<Path>) -> FsResult<SharedStore> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || FsDb::open(path)).await??;
        Ok(Self::new(db))
    }

    /// Open an in-memory store (ephemeral; for tests and scratch mounts).
    pub async fn in_memory() -> FsResult<SharedStore> {
        let db = tokio::task::spawn_blocking(FsDb::in_memory).await??;
        Ok(Self::new(db))
    }

    /// Run one blocking database call off the async runtime.
    async fn run<T, F>(&self, f: F) -> FsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FsDb) -> SqliteResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let out = tokio::task::spawn_blocking(move || {
            let mut db = db.lock();
            f(&mut db)
        })
        .await??;
        Ok(out)
    }

    /// Point lookup by inode id.
    pub async fn get_inode(&self, id: InodeId) -> FsResult<Option<Inode>> {
        self.run(move |db| db.get_inode(id)).await
    }

    /// Indexed lookup of one child by (parent, name).
    pub async fn child_by_name(&self, parent: InodeId, name: String) -> FsResult<Option<Inode>> {
        self.run(move |db| db.child_by_name(parent, &name)).await
    }

    /// Indexed scan of a directory's direct children.
    pub async fn children_of(&self, parent: InodeId) -> FsResult<Vec<Inode>> {
        self.run(move |db| db.children_of(parent)).await
    }

    /// Insert a directory inode.
    pub async fn insert_inode(&self, inode: Inode) -> FsResult<Inode> {
        self.run(move |db| {
            db.insert_inode(&inode)?;
            Ok(inode)
        })
        .await
    }

    /// Insert a file inode and its payload atomically.
    pub async fn insert_file(
        &self,
        inode: Inode,
        media_type: String,
        data: Vec<u8>,
    ) -> FsResult<Inode> {
        self.run(move |db| {
            db.insert_file(&inode, &media_type, &data)?;
            Ok(inode)
        })
        .await
    }

    /// Remove one inode and its payload (if any) atomically.
    pub async fn remove_entry(&self, id: InodeId) -> FsResult<()> {
        self.run(move |db| db.remove_entry(id)).await
    }

    /// Update an inode's access time.
    pub async fn touch_atime(&self, id: InodeId, atime: i64) -> FsResult<()> {
        self.run(move |db| db.touch_atime(id, atime)).await
    }

    /// Fetch the payload for a file inode.
    pub async fn get_file_data(&self, id: InodeId) -> FsResult<Option<FileData>> {
        self.run(move |db| db.get_file_data(id)).await
    }

    /// Look up the root inode, creating it if absent. Idempotent.
    pub async fn ensure_root(&self) -> FsResult<Inode> {
        self.run(|db| db.ensure_root()).await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("db", &"<sqlite>").finish()
    }
}
