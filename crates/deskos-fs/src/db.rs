//! SQLite persistence for the inode tree.
//!
//! Two tables, three indices: `inodes` keyed by id with a by-parent index
//! and a unique by-(parent, name) index, and `file_data` keyed by the owning
//! inode id. The unique index doubles as the single-root guarantee, since
//! the root is the one row with the empty parent sentinel and the empty name.
//!
//! This is the synchronous core; [`crate::store::Store`] wraps it for async
//! callers. Writes that touch both tables always run in one transaction so a
//! reader never observes a file inode without its payload or vice versa.

use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::path::Path;

use crate::types::{Inode, InodeId, InodeKind};

/// Root parent sentinel stored in `inodes.parent_id`.
///
/// An empty string rather than NULL: SQLite treats NULLs as distinct in
/// unique indexes, so a NULL parent would not enforce the single-root
/// invariant at the backend.
const ROOT_PARENT: &str = "";

/// The payload record paired 1:1 with a file inode.
#[derive(Debug, Clone)]
pub struct FileData {
    pub inode_id: InodeId,
    pub media_type: String,
    pub data: Vec<u8>,
}

const SCHEMA: &str = r#"
-- Inode table: directory tree metadata, held together by parent back-references
CREATE TABLE IF NOT EXISTS inodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    parent_id TEXT NOT NULL,
    ctime INTEGER NOT NULL,
    mtime INTEGER NOT NULL,
    atime INTEGER NOT NULL
);
-- Sibling names are unique; also enforces the single root ('', '')
CREATE UNIQUE INDEX IF NOT EXISTS idx_inodes_parent_name ON inodes(parent_id, name);
-- readdir-style scans
CREATE INDEX IF NOT EXISTS idx_inodes_parent ON inodes(parent_id);

-- File payloads, 1:1 with file-kind inodes
CREATE TABLE IF NOT EXISTS file_data (
    inode_id TEXT PRIMARY KEY,
    media_type TEXT NOT NULL,
    data BLOB NOT NULL
);
"#;

/// Database handle for the inode tree.
pub struct FsDb {
    conn: Connection,
}

impl FsDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing and scratch mounts).
    pub fn in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // =========================================================================
    // Inode lookups
    // =========================================================================

    /// Point lookup by inode id.
    pub fn get_inode(&self, id: InodeId) -> SqliteResult<Option<Inode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, parent_id, ctime, mtime, atime
             FROM inodes WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_inode(row)?)),
            None => Ok(None),
        }
    }

    /// Indexed lookup of one child by (parent, name).
    pub fn child_by_name(&self, parent: InodeId, name: &str) -> SqliteResult<Option<Inode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, parent_id, ctime, mtime, atime
             FROM inodes WHERE parent_id = ?1 AND name = ?2",
        )?;

        let mut rows = stmt.query(params![parent.to_string(), name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_inode(row)?)),
            None => Ok(None),
        }
    }

    /// Indexed scan of all direct children of a directory, sorted by name.
    pub fn children_of(&self, parent: InodeId) -> SqliteResult<Vec<Inode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, parent_id, ctime, mtime, atime
             FROM inodes WHERE parent_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![parent.to_string()], |row| row_to_inode(row))?;
        rows.collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a directory inode.
    ///
    /// Fails with a constraint violation if the (parent, name) slot is taken.
    pub fn insert_inode(&self, inode: &Inode) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO inodes (id, kind, name, parent_id, ctime, mtime, atime)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                inode.id.to_string(),
                inode.kind.as_str(),
                inode.name,
                parent_str(inode),
                inode.ctime,
                inode.mtime,
                inode.atime,
            ],
        )?;
        Ok(())
    }

    /// Insert a file inode and its payload in one transaction.
    pub fn insert_file(&mut self, inode: &Inode, media_type: &str, data: &[u8]) -> SqliteResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO inodes (id, kind, name, parent_id, ctime, mtime, atime)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                inode.id.to_string(),
                inode.kind.as_str(),
                inode.name,
                parent_str(inode),
                inode.ctime,
                inode.mtime,
                inode.atime,
            ],
        )?;
        tx.execute(
            "INSERT INTO file_data (inode_id, media_type, data) VALUES (?1, ?2, ?3)",
            params![inode.id.to_string(), media_type, data],
        )?;
        tx.commit()
    }

    /// Remove one inode and its payload (if any) in one transaction.
    ///
    /// Removes a single entry only; recursive removal is driven a node at a
    /// time by the caller.
    pub fn remove_entry(&mut self, id: InodeId) -> SqliteResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM inodes WHERE id = ?1", params![id.to_string()])?;
        tx.execute(
            "DELETE FROM file_data WHERE inode_id = ?1",
            params![id.to_string()],
        )?;
        tx.commit()
    }

    /// Update an inode's access time.
    pub fn touch_atime(&self, id: InodeId, atime: i64) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE inodes SET atime = ?1 WHERE id = ?2",
            params![atime, id.to_string()],
        )?;
        Ok(())
    }

    /// Fetch the payload for a file inode.
    pub fn get_file_data(&self, id: InodeId) -> SqliteResult<Option<FileData>> {
        let mut stmt = self
            .conn
            .prepare("SELECT media_type, data FROM file_data WHERE inode_id = ?1")?;

        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(FileData {
                inode_id: id,
                media_type: row.get(0)?,
                data: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Root bootstrap
    // =========================================================================

    /// Look up the root inode, creating it if absent.
    ///
    /// Two first-time callers racing through separate connections cannot
    /// produce two roots: the insert hits the unique (parent, name) index,
    /// and the loser falls back to re-reading the winner's row.
    pub fn ensure_root(&self) -> SqliteResult<Inode> {
        if let Some(root) = self.get_root()? {
            return Ok(root);
        }

        let root = Inode::new(InodeKind::Directory, "", None);
        match self.insert_inode(&root) {
            Ok(()) => Ok(root),
            Err(e) if is_unique_violation(&e) => self
                .get_root()?
                .ok_or(rusqlite::Error::QueryReturnedNoRows),
            Err(e) => Err(e),
        }
    }

    fn get_root(&self) -> SqliteResult<Option<Inode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, parent_id, ctime, mtime, atime
             FROM inodes WHERE parent_id = ?1",
        )?;

        let mut rows = stmt.query(params![ROOT_PARENT])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_inode(row)?)),
            None => Ok(None),
        }
    }
}

fn parent_str(inode: &Inode) -> String {
    inode
        .parent
        .map(|p| p.to_string())
        .unwrap_or_else(|| ROOT_PARENT.to_string())
}

fn row_to_inode(row: &Row<'_>) -> SqliteResult<Inode> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let parent: String = row.get(3)?;

    let id = InodeId::parse(&id).map_err(|e| conversion_err(0, e))?;
    let kind = InodeKind::from_str(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown inode kind: {kind}").into(),
        )
    })?;
    let parent = if parent == ROOT_PARENT {
        None
    } else {
        Some(InodeId::parse(&parent).map_err(|e| conversion_err(3, e))?)
    };

    Ok(Inode {
        id,
        kind,
        name: row.get(2)?,
        parent,
        ctime: row.get(4)?,
        mtime: row.get(5)?,
        atime: row.get(6)?,
    })
}

fn conversion_err(idx: usize, e: uuid::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Returns true if the error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_bootstrap_idempotent() {
        let db = FsDb::in_memory().unwrap();
        let a = db.ensure_root().unwrap();
        let b = db.ensure_root().unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.is_root());
        assert!(a.is_dir());
        assert_eq!(a.name, "");
    }

    #[test]
    fn test_inode_crud() {
        let db = FsDb::in_memory().unwrap();
        let root = db.ensure_root().unwrap();

        let dir = Inode::new(InodeKind::Directory, "notes", Some(root.id));
        db.insert_inode(&dir).unwrap();

        let loaded = db.child_by_name(root.id, "notes").unwrap().unwrap();
        assert_eq!(loaded.id, dir.id);
        assert_eq!(loaded.parent, Some(root.id));
        assert!(loaded.is_dir());

        let by_id = db.get_inode(dir.id).unwrap().unwrap();
        assert_eq!(by_id.name, "notes");

        assert!(db.child_by_name(root.id, "missing").unwrap().is_none());
    }

    #[test]
    fn test_sibling_names_unique() {
        let db = FsDb::in_memory().unwrap();
        let root = db.ensure_root().unwrap();

        db.insert_inode(&Inode::new(InodeKind::Directory, "a", Some(root.id)))
            .unwrap();
        let dup = db.insert_inode(&Inode::new(InodeKind::Directory, "a", Some(root.id)));
        assert!(matches!(dup, Err(ref e) if is_unique_violation(e)));
    }

    #[test]
    fn test_file_insert_and_remove_paired() {
        let mut db = FsDb::in_memory().unwrap();
        let root = db.ensure_root().unwrap();

        let file = Inode::new(InodeKind::File, "a.txt", Some(root.id));
        db.insert_file(&file, "text/plain", b"hi").unwrap();

        let data = db.get_file_data(file.id).unwrap().unwrap();
        assert_eq!(data.media_type, "text/plain");
        assert_eq!(data.data, b"hi");

        db.remove_entry(file.id).unwrap();
        assert!(db.get_inode(file.id).unwrap().is_none());
        assert!(db.get_file_data(file.id).unwrap().is_none());
    }

    #[test]
    fn test_children_scan_sorted() {
        let db = FsDb::in_memory().unwrap();
        let root = db.ensure_root().unwrap();

        for name in ["c", "a", "b"] {
            db.insert_inode(&Inode::new(InodeKind::Directory, name, Some(root.id)))
                .unwrap();
        }

        let children = db.children_of(root.id).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_touch_atime() {
        let db = FsDb::in_memory().unwrap();
        let root = db.ensure_root().unwrap();

        let file = Inode::new(InodeKind::File, "x", Some(root.id));
        db.insert_inode(&file).unwrap();
        db.touch_atime(file.id, file.atime + 1000).unwrap();

        let loaded = db.get_inode(file.id).unwrap().unwrap();
        assert_eq!(loaded.atime, file.atime + 1000);
    }
}
