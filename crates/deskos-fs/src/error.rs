//! Filesystem error types.

use thiserror::Error;

/// Filesystem error type.
///
/// Everything except [`FsError::Storage`] and [`FsError::TaskFailed`] is a
/// structural error: an expected, recoverable outcome the caller can display
/// (a terminal prints it, an editor shows it inline). Storage failures are
/// propagated verbatim and should be treated as fatal by consumers.
#[derive(Debug, Error)]
pub enum FsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Containing directory does not exist (or is a file).
    #[error("parent directory not found: {0}")]
    ParentNotFound(String),

    /// Target is a directory and the operation was not recursive.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Invalid path (e.g. structural operations on the root).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The process-wide backend has not been initialized.
    #[error("filesystem backend is not mounted")]
    NotMounted,

    /// Opaque backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::NotAFile(path.into())
    }

    /// Create a ParentNotFound error.
    pub fn parent_not_found(path: impl Into<String>) -> Self {
        Self::ParentNotFound(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Returns true for the recoverable, caller-displayable errors.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::NotMounted | Self::Storage(_) | Self::TaskFailed(_))
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_vs_fatal() {
        let structural = [
            FsError::not_found("/a"),
            FsError::already_exists("/a"),
            FsError::not_a_directory("/a"),
            FsError::not_a_file("/a"),
            FsError::parent_not_found("/a"),
            FsError::is_a_directory("/a"),
            FsError::invalid_path("/"),
        ];
        for err in &structural {
            assert!(err.is_structural(), "{err} should be structural");
        }

        assert!(!FsError::NotMounted.is_structural());
        assert!(!FsError::Storage(rusqlite::Error::QueryReturnedNoRows).is_structural());
    }
}
