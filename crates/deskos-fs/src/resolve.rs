//! Path resolution: absolute path string → inode.
//!
//! The resolver is read-only. It walks a normalized segment list from the
//! root, one (parent, name) index lookup per segment, and reports the first
//! missing segment as `None` without creating anything. The only write it
//! ever performs is the lazy, idempotent root bootstrap.

use crate::error::FsResult;
use crate::store::SharedStore;
use crate::types::Inode;

/// Walks paths against a shared store.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: SharedStore,
}

impl Resolver {
    /// Create a resolver over the given store.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The root inode, created on first use.
    ///
    /// Safe to call repeatedly and concurrently: the backend's unique
    /// (parent, name) index guarantees at most one root ever exists.
    pub async fn root(&self) -> FsResult<Inode> {
        self.store.ensure_root().await
    }

    /// Resolve an absolute path to its inode, or `None` if any segment of
    /// the path does not exist.
    ///
    /// Each segment is one backend round trip; a concurrent mutation of an
    /// ancestor between round trips is an accepted race (see crate docs).
    pub async fn resolve(&self, path: &str) -> FsResult<Option<Inode>> {
        let mut current = self.root().await?;
        for segment in deskos_paths::segments(path) {
            match self
                .store
                .child_by_name(current.id, segment.to_string())
                .await?
            {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::{Inode, InodeKind};

    async fn store_with_tree() -> (SharedStore, Inode) {
        let store = Store::in_memory().await.unwrap();
        let root = store.ensure_root().await.unwrap();

        let a = Inode::new(InodeKind::Directory, "a", Some(root.id));
        store.insert_inode(a.clone()).await.unwrap();
        let b = Inode::new(InodeKind::Directory, "b", Some(a.id));
        store.insert_inode(b.clone()).await.unwrap();
        let f = Inode::new(InodeKind::File, "f.txt", Some(b.id));
        store
            .insert_file(f, "text/plain".into(), b"x".to_vec())
            .await
            .unwrap();

        (store, root)
    }

    #[tokio::test]
    async fn test_resolve_walks_segments() {
        let (store, root) = store_with_tree().await;
        let resolver = Resolver::new(store);

        let got = resolver.resolve("/").await.unwrap().unwrap();
        assert_eq!(got.id, root.id);

        let a = resolver.resolve("/a").await.unwrap().unwrap();
        assert_eq!(a.name, "a");
        assert!(a.is_dir());

        let f = resolver.resolve("/a/b/f.txt").await.unwrap().unwrap();
        assert!(f.is_file());
        assert_eq!(f.name, "f.txt");
    }

    #[tokio::test]
    async fn test_resolve_missing_is_none() {
        let (store, _) = store_with_tree().await;
        let resolver = Resolver::new(store);

        assert!(resolver.resolve("/nope").await.unwrap().is_none());
        assert!(resolver.resolve("/a/nope/f.txt").await.unwrap().is_none());
        // resolving through a file fails at the next segment
        assert!(resolver.resolve("/a/b/f.txt/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_normalizes() {
        let (store, _) = store_with_tree().await;
        let resolver = Resolver::new(store);

        let f = resolver
            .resolve("/a/./b/../b//f.txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(f.name, "f.txt");
    }

    #[tokio::test]
    async fn test_root_is_lazy_and_stable() {
        let store = Store::in_memory().await.unwrap();
        let resolver = Resolver::new(store);

        let r1 = resolver.root().await.unwrap();
        let r2 = resolver.root().await.unwrap();
        assert_eq!(r1.id, r2.id);
        assert!(r1.is_root());
    }
}
