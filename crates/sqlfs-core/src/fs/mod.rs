//! Filesystem operations over the relational store.
//!
//! [`SqlFs`] owns the store connection. Each operation resolves its
//! path through the path index, issues one or more prepared statements,
//! and surfaces an [`FsError`] ready for errno translation. Operations
//! that mutate more than one row run inside a transaction, so a failed
//! sub-step rolls back rather than leaving the link-count bookkeeping
//! half-applied.

mod attr;
mod dir;
mod io;
mod name;

use std::path::Path;

use crate::db::Db;
use crate::error::{FsError, FsResult};
use crate::path::parent_of;
use crate::types::{FileId, PathId, PathInfo};

/// A filesystem persisted as rows in a single SQLite database.
pub struct SqlFs {
    db: Db,
}

impl SqlFs {
    /// Open (creating if needed) the filesystem stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> FsResult<SqlFs> {
        Ok(SqlFs { db: Db::open(path)? })
    }

    /// In-memory filesystem, used by tests.
    pub fn open_in_memory() -> FsResult<SqlFs> {
        Ok(SqlFs {
            db: Db::open_in_memory()?,
        })
    }

    /// Wrap an already-opened store.
    pub fn new(db: Db) -> SqlFs {
        SqlFs { db }
    }

    /// Reverse lookup for upcall adapters that address entries by row
    /// id.
    pub fn path_by_id(&self, id: PathId) -> FsResult<Option<String>> {
        self.db.path_by_id(id)
    }

    /// Flush the write-ahead log at unmount. Cached statements and the
    /// connection itself drop with the value.
    pub fn destroy(&self) {
        if let Err(err) = self.db.checkpoint() {
            tracing::warn!(error = %err, "wal checkpoint failed at unmount");
        }
    }

    /// Resolve `path` or fail with `not-found`.
    fn require(&self, path: &str) -> FsResult<PathInfo> {
        self.db
            .path_info(path)?
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Fail with `exists` when `path` already names an entry.
    fn require_absent(&self, path: &str) -> FsResult<()> {
        match self.db.path_id(path)? {
            Some(_) => Err(FsError::AlreadyExists(path.to_string())),
            None => Ok(()),
        }
    }

    /// Insert a path row beneath its enclosing directory, which must
    /// already exist.
    fn insert_entry(
        &self,
        path: &str,
        mode: u32,
        file_id: FileId,
        uid: u32,
        gid: u32,
    ) -> FsResult<()> {
        let parent: &str = parent_of(path);
        let parent_id: PathId = self
            .db
            .path_id(parent)?
            .ok_or_else(|| FsError::NotFound(parent.to_string()))?;
        self.db.insert_path(path, parent_id, uid, gid, mode, file_id)
    }
}
