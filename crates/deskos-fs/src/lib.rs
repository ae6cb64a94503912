//! # deskos-fs
//!
//! Persistent, hierarchical virtual filesystem for the deskos desktop.
//!
//! An inode-based directory tree lives in embedded SQLite (two tables, three
//! indices) behind an async, path-based API. Key components:
//!
//! - [`Filesystem`] - the public operations (cwd, chdir, exists,
//!   is_directory, mkdir, write_file, read_file, read_dir, rm)
//! - [`Resolver`] - walks normalized paths segment by segment from the root
//! - [`Store`] / [`mount`] - the async storage backend and its process-wide
//!   lifecycle
//! - [`bootstrap`] - first-run seeding of the default tree
//!
//! ## Design decisions
//!
//! - **Back-references, not child lists**: a directory never owns its
//!   children; they point at it via `parent`. No cyclic ownership, and
//!   sibling-name uniqueness is a backend index, not application logic.
//! - **Paths in, paths out**: consumers never see inode ids. Each
//!   [`Filesystem`] is a session with its own cwd over the shared store.
//! - **Bounded transactions**: inode + payload pairs commit atomically;
//!   recursive structural operations deliberately do not (one transaction
//!   per node, partial completion possible — see [`fs`] module docs).

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod fs;
pub mod mount;
pub mod resolve;
pub mod store;
pub mod types;

pub use bootstrap::{ensure_default_filesystem, WELCOME_NOTE_PATH};
pub use db::{FileData, FsDb};
pub use error::{FsError, FsResult};
pub use fs::Filesystem;
pub use mount::{initialize, shared, shutdown, MountConfig};
pub use resolve::Resolver;
pub use store::{SharedStore, Store};
pub use types::{File, Folder, Inode, InodeId, InodeKind, MkdirOptions, RmOptions};
