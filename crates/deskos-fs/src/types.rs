//! Core filesystem types.
//!
//! These are the records consumers see: inode metadata plus the composite
//! results of `read_file` / `read_dir`. All are serde-derived so UI layers
//! can ship them across whatever boundary they live behind.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// An inode identifier (UUIDv4). Opaque to consumers; never used as a path.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InodeId(uuid::Uuid);

impl InodeId {
    /// Create a new random ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse from standard UUID text.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for InodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InodeId({})", self.0)
    }
}

/// Inode kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InodeKind {
    /// Regular file, paired 1:1 with a payload record.
    File,
    /// Directory; children reference it via their parent id.
    Directory,
}

impl InodeKind {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, InodeKind::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, InodeKind::Directory)
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            InodeKind::File => "file",
            InodeKind::Directory => "dir",
        }
    }

    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(InodeKind::File),
            "dir" => Some(InodeKind::Directory),
            _ => None,
        }
    }
}

/// Metadata record for one filesystem entry.
///
/// The tree is held together by back-references: a directory never owns a
/// child list, its children point at it through `parent`. `parent` is `None`
/// only for the root, whose `name` is the empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inode {
    /// Unique identifier.
    pub id: InodeId,
    /// File or directory.
    pub kind: InodeKind,
    /// Basename within the parent directory. Empty only for the root.
    pub name: String,
    /// Parent inode, or `None` for the root.
    pub parent: Option<InodeId>,
    /// Creation time, unix millis.
    pub ctime: i64,
    /// Last content modification, unix millis.
    pub mtime: i64,
    /// Last access, unix millis.
    pub atime: i64,
}

impl Inode {
    /// Create a fresh inode under the given parent with all timestamps set
    /// to now.
    pub fn new(kind: InodeKind, name: impl Into<String>, parent: Option<InodeId>) -> Self {
        let now = now_millis();
        Self {
            id: InodeId::new(),
            kind,
            name: name.into(),
            parent,
            ctime: now,
            mtime: now,
            atime: now,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is the root inode.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A file inode together with its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// The file's metadata.
    pub inode: Inode,
    /// Media type tag (e.g. `text/plain`).
    pub media_type: String,
    /// The opaque byte payload.
    pub data: Vec<u8>,
}

/// A directory inode together with its direct children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// The directory's metadata.
    pub inode: Inode,
    /// Direct children, sorted by name.
    pub children: Vec<Inode>,
}

/// Options for [`Filesystem::mkdir`](crate::Filesystem::mkdir).
#[derive(Debug, Clone, Copy, Default)]
pub struct MkdirOptions {
    /// Create missing ancestor directories, one level at a time.
    pub recursive: bool,
}

impl MkdirOptions {
    /// Equivalent of `mkdir -p`.
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Options for [`Filesystem::rm`](crate::Filesystem::rm).
#[derive(Debug, Clone, Copy, Default)]
pub struct RmOptions {
    /// Remove directory contents depth-first before the directory itself.
    pub recursive: bool,
    /// Treat a missing target as a successful no-op.
    pub force: bool,
}

impl RmOptions {
    /// Equivalent of `rm -r`.
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            force: false,
        }
    }

    /// Equivalent of `rm -rf`.
    pub fn recursive_force() -> Self {
        Self {
            recursive: true,
            force: true,
        }
    }
}

/// Current wall-clock time in unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
