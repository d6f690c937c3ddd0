//! Error types for filesystem operations.

use thiserror::Error;

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors surfaced by filesystem operations.
///
/// Every operation either succeeds or returns exactly one of these.
/// Store-level failures (a failed statement step, a blob handle that
/// could not be opened, a blob read/write error) are collapsed into
/// [`FsError::Store`] / [`FsError::Io`]; callers see an EIO-equivalent
/// and the underlying message is logged at the upcall boundary.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path does not name an entry.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// Path already names an entry.
    #[error("file exists: {0}")]
    AlreadyExists(String),

    /// The entry is a directory but the operation wants a file.
    #[error("is a directory: {0}")]
    IsDirectory(String),

    /// The entry is not a directory but the operation wants one.
    #[error("not a directory: {0}")]
    NotDirectory(String),

    /// The directory still has children.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Blob handle I/O failed.
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// POSIX errno for this error.
    ///
    /// Returned positive; the FUSE reply layer negates it on the wire.
    /// Non-empty directories report `EPERM`, not `ENOTEMPTY`.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::AlreadyExists(_) => libc::EEXIST,
            FsError::IsDirectory(_) => libc::EISDIR,
            FsError::NotDirectory(_) => libc::ENOTDIR,
            FsError::NotEmpty(_) => libc::EPERM,
            FsError::Store(_) => libc::EIO,
            FsError::Io(_) => libc::EIO,
        }
    }

    /// True for the failures that indicate a broken store rather than a
    /// caller mistake.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, FsError::Store(_) | FsError::Io(_))
    }
}
