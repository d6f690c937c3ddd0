//! SQLite-backed POSIX filesystem core.
//!
//! The entire filesystem state (directory tree, file metadata, file
//! contents, symbolic links) lives in two relational tables:
//! `paths`, one row per name in the namespace, and `files`, one row per
//! content object carrying a hard-link count. Multiple path rows may
//! reference one file row (hard links); the file row is reclaimed when
//! its link count drops to zero.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: SqlFs operations (mkdir, unlink, rename, read, write, ...)
//! Layer 2: Path index + file store (row lookups, link counts, blob I/O)
//! Layer 1: Db (connection, schema, prepared-statement cache)
//! ```
//!
//! Paths are stored whole, keyed by the full absolute string; directory
//! membership is answered with `parent_id`, so string equality is the
//! only lookup predicate. The root "/" is implicit with id 0 and never
//! stored as a row.
//!
//! # Example
//!
//! ```ignore
//! use sqlfs_core::SqlFs;
//!
//! let fs = SqlFs::open("state.db")?;
//! fs.mkdir("/inbox", 0o755, 1000, 1000)?;
//! fs.mknod("/inbox/hello", 0o644, 0, 1000, 1000)?;
//! fs.write("/inbox/hello", 0, b"hello")?;
//! ```

pub mod db;
pub mod error;
pub mod fs;
pub mod path;
pub mod schema;
pub mod types;

mod file;

pub use db::Db;
pub use error::{FsError, FsResult};
pub use fs::SqlFs;
pub use types::{
    unix_now, DirEntry, EntryKind, FileId, FileStat, PathId, PathInfo, ROOT_PATH_ID,
};
