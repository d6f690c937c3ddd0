//! Attribute operations: stat, chmod, chown, utimens, truncate.

use rusqlite::OptionalExtension;

use super::SqlFs;
use crate::error::{FsError, FsResult};
use crate::path::is_root;
use crate::schema;
use crate::types::{unix_now, FileStat, PathInfo, ROOT_PATH_ID};

impl SqlFs {
    /// Stat one name. The implicit root is synthesized with the current
    /// process credentials and the current time.
    pub fn getattr(&self, path: &str) -> FsResult<FileStat> {
        if is_root(path) {
            let now: i64 = unix_now();
            return Ok(FileStat {
                id: ROOT_PATH_ID,
                uid: unsafe { libc::getuid() },
                gid: unsafe { libc::getgid() },
                mode: libc::S_IFDIR | 0o755,
                atime: now,
                mtime: now,
                ctime: now,
                size: 0,
                nlink: 1,
            });
        }
        let mut stmt = self.db.stmt(schema::SELECT_STAT_BY_PATH)?;
        let stat = stmt
            .query_row([path], |row| {
                Ok(FileStat {
                    id: row.get(0)?,
                    uid: row.get(1)?,
                    gid: row.get(2)?,
                    mode: row.get(3)?,
                    atime: row.get(4)?,
                    mtime: row.get(5)?,
                    ctime: row.get(6)?,
                    size: row.get::<_, i64>(7)? as u64,
                    nlink: row.get(8)?,
                })
            })
            .optional()?;
        stat.ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Replace the permission bits, preserving the stored type bits.
    pub fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        let new_mode: u32 = (info.mode & libc::S_IFMT) | (mode & 0o7777);
        self.db.set_mode(info.id, new_mode)
    }

    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        self.db.set_owner(info.id, uid, gid)
    }

    /// Set access and modification times, in whole seconds.
    pub fn utimens(&self, path: &str, atime: i64, mtime: i64) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        self.db.set_times(info.id, atime, mtime)
    }

    /// Shrink-only truncate: growing past the current size is a no-op.
    pub fn truncate(&self, path: &str, new_size: u64) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        self.db.shrink_file(info.file_id, new_size)
    }
}
