//! The path-based filesystem API.
//!
//! Each [`Filesystem`] is a session: it owns a current working directory and
//! shares the mounted store (and therefore one root) with every other
//! session. Consumers — the terminal, the note editor, the bootstrap routine
//! — only ever speak paths; inode ids never cross this boundary.
//!
//! ## Atomicity
//!
//! Single-entry creation and deletion are atomic: where an operation touches
//! both the inode and file-data tables, that pair is one backend
//! transaction. Structural operations are not atomic end-to-end. Resolution
//! (read) and mutation (write) are separate backend round trips, and
//! recursive `mkdir`/`rm` commit one node per transaction, so a failure
//! partway leaves a partially created or deleted subtree. Callers must treat
//! that as a possible outcome; there is no rollback or compensating cleanup.
//!
//! ## Overwrite window
//!
//! `write_file` over an existing path removes the old entry before inserting
//! the new one. A concurrent reader between those two round trips observes
//! the file as missing. This mirrors the behavior the desktop shipped with
//! and is documented rather than fixed.

use parking_lot::RwLock;
use tracing::debug;

use crate::db::is_unique_violation;
use crate::error::{FsError, FsResult};
use crate::mount;
use crate::resolve::Resolver;
use crate::store::SharedStore;
use crate::types::{now_millis, File, Folder, Inode, InodeKind, MkdirOptions, RmOptions};

/// A filesystem session over the shared store.
#[derive(Debug)]
pub struct Filesystem {
    store: SharedStore,
    resolver: Resolver,
    cwd: RwLock<String>,
}

impl Filesystem {
    /// Create a session over the given store, starting at `/`.
    pub fn new(store: SharedStore) -> Self {
        let resolver = Resolver::new(store.clone());
        Self {
            store,
            resolver,
            cwd: RwLock::new(deskos_paths::ROOT.to_string()),
        }
    }

    /// Create a session over the process-wide mounted store.
    pub async fn mounted() -> FsResult<Self> {
        Ok(Self::new(mount::shared().await?))
    }

    /// The current working directory. Pure; no backend access.
    pub fn cwd(&self) -> String {
        self.cwd.read().clone()
    }

    /// Resolve a (possibly relative) path against the cwd.
    fn abs(&self, path: &str) -> String {
        deskos_paths::resolve(&self.cwd.read(), path)
    }

    /// Change the working directory.
    ///
    /// Returns the new normalized absolute cwd. On failure the cwd is
    /// unchanged.
    pub async fn chdir(&self, path: &str) -> FsResult<String> {
        let abs = self.abs(path);
        match self.resolver.resolve(&abs).await? {
            None => Err(FsError::not_found(abs)),
            Some(inode) if !inode.is_dir() => Err(FsError::not_a_directory(abs)),
            Some(_) => {
                *self.cwd.write() = abs.clone();
                Ok(abs)
            }
        }
    }

    /// True iff the path resolves to an inode.
    pub async fn exists(&self, path: &str) -> FsResult<bool> {
        let abs = self.abs(path);
        Ok(self.resolver.resolve(&abs).await?.is_some())
    }

    /// True iff the path resolves to a directory.
    pub async fn is_directory(&self, path: &str) -> FsResult<bool> {
        let abs = self.abs(path);
        Ok(self
            .resolver
            .resolve(&abs)
            .await?
            .is_some_and(|inode| inode.is_dir()))
    }

    /// Create a directory.
    ///
    /// With `recursive`, missing ancestors are created top-down, one
    /// directory per backend transaction — a failure partway leaves the
    /// ancestors already created.
    pub async fn mkdir(&self, path: &str, opts: MkdirOptions) -> FsResult<Inode> {
        let abs = self.abs(path);
        if deskos_paths::is_root(&abs) {
            return Err(FsError::invalid_path(abs));
        }

        if self.resolver.resolve(&abs).await?.is_some() {
            return Err(FsError::already_exists(abs));
        }

        let parent_abs = deskos_paths::dirname(&abs);
        let parent = match self.resolver.resolve(&parent_abs).await? {
            Some(inode) if inode.is_dir() => inode,
            Some(_) => return Err(FsError::parent_not_found(parent_abs)),
            None if opts.recursive => self.mkdir_ancestors(&parent_abs).await?,
            None => return Err(FsError::parent_not_found(parent_abs)),
        };

        let inode = Inode::new(InodeKind::Directory, deskos_paths::basename(&abs), Some(parent.id));
        let inode = self
            .insert_dir(inode)
            .await
            .map_err(|e| remap_unique(e, &abs))?;
        debug!("mkdir: {}", abs);
        Ok(inode)
    }

    /// Create every missing directory along `abs`, walking down from the
    /// root. Each level is its own transaction; a concurrent creator of the
    /// same level is tolerated by re-reading the slot.
    async fn mkdir_ancestors(&self, abs: &str) -> FsResult<Inode> {
        let mut current = self.resolver.root().await?;
        let mut current_path = deskos_paths::ROOT.to_string();

        for segment in deskos_paths::segments(abs) {
            current_path = deskos_paths::join(&current_path, segment);
            match self
                .store
                .child_by_name(current.id, segment.to_string())
                .await?
            {
                Some(next) if next.is_dir() => current = next,
                Some(_) => return Err(FsError::parent_not_found(current_path)),
                None => {
                    let inode = Inode::new(InodeKind::Directory, segment, Some(current.id));
                    current = match self.insert_dir(inode).await {
                        Ok(inode) => inode,
                        Err(FsError::Storage(ref e)) if is_unique_violation(e) => self
                            .store
                            .child_by_name(current.id, segment.to_string())
                            .await?
                            .ok_or_else(|| FsError::parent_not_found(current_path.clone()))?,
                        Err(e) => return Err(e),
                    };
                    debug!("mkdir: {} (ancestor)", current_path);
                }
            }
        }
        Ok(current)
    }

    async fn insert_dir(&self, inode: Inode) -> FsResult<Inode> {
        self.store.insert_inode(inode).await
    }

    /// Write a file, replacing whatever is at the path.
    ///
    /// An existing entry is removed first (a directory loses its descendants
    /// too, so no inode is ever orphaned); the new inode and payload are then
    /// inserted in one transaction. See the module docs for the overwrite
    /// window this opens.
    pub async fn write_file(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
    ) -> FsResult<Inode> {
        let abs = self.abs(path);
        if deskos_paths::is_root(&abs) {
            return Err(FsError::invalid_path(abs));
        }

        if let Some(existing) = self.resolver.resolve(&abs).await? {
            self.remove_tree(existing, true).await?;
        }

        let parent_abs = deskos_paths::dirname(&abs);
        let parent = match self.resolver.resolve(&parent_abs).await? {
            Some(inode) if inode.is_dir() => inode,
            _ => return Err(FsError::parent_not_found(parent_abs)),
        };

        let inode = Inode::new(InodeKind::File, deskos_paths::basename(&abs), Some(parent.id));
        let inode = self
            .store
            .insert_file(inode, media_type.into(), data.into())
            .await
            .map_err(|e| remap_unique(e, &abs))?;
        debug!("write_file: {}", abs);
        Ok(inode)
    }

    /// Read a file's metadata and payload. Bumps the access time.
    pub async fn read_file(&self, path: &str) -> FsResult<File> {
        let abs = self.abs(path);
        let mut inode = match self.resolver.resolve(&abs).await? {
            None => return Err(FsError::not_found(abs)),
            Some(inode) if !inode.is_file() => return Err(FsError::not_a_file(abs)),
            Some(inode) => inode,
        };

        // Invariant: a file inode always has its payload row (they change in
        // one transaction), so a miss here is backend corruption.
        let data = self
            .store
            .get_file_data(inode.id)
            .await?
            .ok_or(FsError::Storage(rusqlite::Error::QueryReturnedNoRows))?;

        inode.atime = now_millis();
        self.store.touch_atime(inode.id, inode.atime).await?;

        Ok(File {
            inode,
            media_type: data.media_type,
            data: data.data,
        })
    }

    /// Read a directory's metadata and direct children.
    pub async fn read_dir(&self, path: &str) -> FsResult<Folder> {
        let abs = self.abs(path);
        let inode = match self.resolver.resolve(&abs).await? {
            None => return Err(FsError::not_found(abs)),
            Some(inode) if !inode.is_dir() => return Err(FsError::not_a_directory(abs)),
            Some(inode) => inode,
        };

        let children = self.store.children_of(inode.id).await?;
        Ok(Folder { inode, children })
    }

    /// Remove a file or directory.
    ///
    /// Recursive removal is depth-first — children are fully removed before
    /// their parent — as a sequence of per-node transactions; a failure
    /// partway leaves the remaining subtree in place.
    pub async fn rm(&self, path: &str, opts: RmOptions) -> FsResult<()> {
        let abs = self.abs(path);
        if deskos_paths::is_root(&abs) {
            return Err(FsError::invalid_path(abs));
        }

        let inode = match self.resolver.resolve(&abs).await? {
            Some(inode) => inode,
            None if opts.force => return Ok(()),
            None => return Err(FsError::not_found(abs)),
        };

        if inode.is_dir() && !opts.recursive {
            return Err(FsError::is_a_directory(abs));
        }

        self.remove_tree(inode, opts.recursive).await?;
        debug!("rm: {}", abs);
        Ok(())
    }

    /// Remove an inode, and with `recursive` its whole subtree bottom-up.
    ///
    /// An explicit worklist rather than recursion: parent references point
    /// strictly toward the root so the walk terminates, but directory depth
    /// is user-controlled.
    async fn remove_tree(&self, inode: Inode, recursive: bool) -> FsResult<()> {
        if !(recursive && inode.is_dir()) {
            return self.store.remove_entry(inode.id).await;
        }

        // Collect breadth-first, then delete in reverse so every node's
        // children are gone before the node itself.
        let mut ordered = vec![inode];
        let mut next = 0;
        while next < ordered.len() {
            if ordered[next].is_dir() {
                let children = self.store.children_of(ordered[next].id).await?;
                ordered.extend(children);
            }
            next += 1;
        }

        for node in ordered.iter().rev() {
            self.store.remove_entry(node.id).await?;
        }
        Ok(())
    }
}

/// A lost insert race means the slot filled between our resolve and our
/// insert; surface it as the structural error, not a storage failure.
fn remap_unique(e: FsError, abs: &str) -> FsError {
    match e {
        FsError::Storage(ref inner) if is_unique_violation(inner) => {
            FsError::already_exists(abs)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    async fn fs() -> Filesystem {
        Filesystem::new(Store::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_mkdir_then_exists() {
        let fs = fs().await;
        fs.mkdir("/a", MkdirOptions::default()).await.unwrap();
        assert!(fs.exists("/a").await.unwrap());
        assert!(fs.is_directory("/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_mkdir_twice_already_exists() {
        let fs = fs().await;
        fs.mkdir("/a", MkdirOptions::default()).await.unwrap();
        let err = fs.mkdir("/a", MkdirOptions::default()).await.unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_mkdir_missing_parent() {
        let fs = fs().await;
        let err = fs.mkdir("/a/b", MkdirOptions::default()).await.unwrap_err();
        assert!(matches!(err, FsError::ParentNotFound(_)));
    }

    #[tokio::test]
    async fn test_mkdir_recursive_creates_chain() {
        let fs = fs().await;
        fs.mkdir("/a/b/c", MkdirOptions::recursive()).await.unwrap();
        for p in ["/a", "/a/b", "/a/b/c"] {
            assert!(fs.is_directory(p).await.unwrap(), "{p} should be a dir");
        }
        let folder = fs.read_dir("/a").await.unwrap();
        assert_eq!(folder.children.len(), 1);
        assert_eq!(folder.children[0].name, "b");
    }

    #[tokio::test]
    async fn test_mkdir_root_invalid() {
        let fs = fs().await;
        let err = fs.mkdir("/", MkdirOptions::recursive()).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let fs = fs().await;
        fs.write_file("/x.txt", "hello", "text/plain").await.unwrap();

        let file = fs.read_file("/x.txt").await.unwrap();
        assert_eq!(file.data, b"hello");
        assert_eq!(file.media_type, "text/plain");
        assert!(file.inode.is_file());
    }

    #[tokio::test]
    async fn test_write_file_replaces_content() {
        let fs = fs().await;
        let first = fs.write_file("/x.txt", "hello", "text/plain").await.unwrap();
        let second = fs.write_file("/x.txt", "world", "text/plain").await.unwrap();
        assert_ne!(first.id, second.id);

        let file = fs.read_file("/x.txt").await.unwrap();
        assert_eq!(file.data, b"world");
        assert_eq!(file.inode.id, second.id);
    }

    #[tokio::test]
    async fn test_write_file_over_directory_replaces_subtree() {
        let fs = fs().await;
        fs.mkdir("/d/sub", MkdirOptions::recursive()).await.unwrap();
        fs.write_file("/d/sub/f.txt", "x", "text/plain").await.unwrap();

        fs.write_file("/d", "now a file", "text/plain").await.unwrap();
        assert!(!fs.is_directory("/d").await.unwrap());
        assert!(!fs.exists("/d/sub").await.unwrap());
        assert!(!fs.exists("/d/sub/f.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_file_missing_parent() {
        let fs = fs().await;
        let err = fs
            .write_file("/nope/x.txt", "x", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::ParentNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_file_wrong_kind() {
        let fs = fs().await;
        fs.mkdir("/d", MkdirOptions::default()).await.unwrap();
        assert!(matches!(
            fs.read_file("/d").await.unwrap_err(),
            FsError::NotAFile(_)
        ));
        assert!(matches!(
            fs.read_file("/missing").await.unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_read_dir_wrong_kind() {
        let fs = fs().await;
        fs.write_file("/f", "x", "text/plain").await.unwrap();
        assert!(matches!(
            fs.read_dir("/f").await.unwrap_err(),
            FsError::NotADirectory(_)
        ));
        assert!(matches!(
            fs.read_dir("/missing").await.unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_rm_non_recursive_on_directory() {
        let fs = fs().await;
        fs.mkdir("/d", MkdirOptions::default()).await.unwrap();
        let err = fs.rm("/d", RmOptions::default()).await.unwrap_err();
        assert!(matches!(err, FsError::IsADirectory(_)));
        assert!(fs.exists("/d").await.unwrap());
    }

    #[tokio::test]
    async fn test_rm_recursive_removes_descendants_first() {
        let fs = fs().await;
        fs.mkdir("/d/a/b", MkdirOptions::recursive()).await.unwrap();
        fs.write_file("/d/a/f.txt", "x", "text/plain").await.unwrap();
        fs.write_file("/d/g.txt", "y", "text/plain").await.unwrap();

        fs.rm("/d", RmOptions::recursive()).await.unwrap();
        for p in ["/d", "/d/a", "/d/a/b", "/d/a/f.txt", "/d/g.txt"] {
            assert!(!fs.exists(p).await.unwrap(), "{p} should be gone");
        }
    }

    #[tokio::test]
    async fn test_rm_missing() {
        let fs = fs().await;
        assert!(matches!(
            fs.rm("/missing", RmOptions::default()).await.unwrap_err(),
            FsError::NotFound(_)
        ));
        // force makes it a no-op
        fs.rm(
            "/missing",
            RmOptions {
                force: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_rm_root_invalid() {
        let fs = fs().await;
        let err = fs.rm("/", RmOptions::recursive_force()).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_chdir_and_relative_paths() {
        let fs = fs().await;
        fs.mkdir("/notes", MkdirOptions::default()).await.unwrap();
        fs.write_file("/notes/a.txt", "hi", "text/plain").await.unwrap();

        assert_eq!(fs.chdir("/notes").await.unwrap(), "/notes");
        assert_eq!(fs.cwd(), "/notes");

        let file = fs.read_file("a.txt").await.unwrap();
        assert_eq!(file.data, b"hi");

        assert_eq!(fs.chdir("..").await.unwrap(), "/");
    }

    #[tokio::test]
    async fn test_chdir_failures_leave_cwd() {
        let fs = fs().await;
        fs.write_file("/x.txt", "x", "text/plain").await.unwrap();

        assert!(matches!(
            fs.chdir("/x.txt").await.unwrap_err(),
            FsError::NotADirectory(_)
        ));
        assert!(matches!(
            fs.chdir("/missing").await.unwrap_err(),
            FsError::NotFound(_)
        ));
        assert_eq!(fs.cwd(), "/");
    }

    #[tokio::test]
    async fn test_read_file_bumps_atime() {
        let fs = fs().await;
        let created = fs.write_file("/x", "x", "text/plain").await.unwrap();
        let file = fs.read_file("/x").await.unwrap();
        assert!(file.inode.atime >= created.atime);
    }
}
