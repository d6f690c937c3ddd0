//! Directory operations: create, remove, enumerate.

use rusqlite::params;

use super::SqlFs;
use crate::error::{FsError, FsResult};
use crate::path::basename;
use crate::schema;
use crate::types::{DirEntry, FileStat, PathId, PathInfo};

impl SqlFs {
    /// Create a directory. Directories carry no file row; their
    /// `file_id` is 0.
    pub fn mkdir(&self, path: &str, mode: u32, uid: u32, gid: u32) -> FsResult<()> {
        self.require_absent(path)?;
        self.insert_entry(path, (mode & 0o7777) | libc::S_IFDIR, 0, uid, gid)
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        if !info.is_dir() {
            return Err(FsError::NotDirectory(path.to_string()));
        }
        if self.db.count_children(info.id)? != 0 {
            return Err(FsError::NotEmpty(path.to_string()));
        }
        self.db.delete_path(info.id)
    }

    /// Resolve a directory to its row id, the opaque handle for
    /// subsequent [`SqlFs::read_dir`] calls.
    pub fn opendir(&self, path: &str) -> FsResult<PathId> {
        self.db
            .path_id(path)?
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// List the entries of the directory `dir`, skipping the first
    /// `offset` rows. Each entry carries the basename and a full stat.
    /// "." and ".." are the upcall adapter's concern and are not
    /// produced here.
    pub fn read_dir(&self, dir: PathId, offset: i64) -> FsResult<Vec<DirEntry>> {
        let mut stmt = self.db.stmt(schema::SELECT_ENTRIES_BY_PARENT_ID)?;
        let rows = stmt.query_map(params![dir, offset], |row| {
            let path: String = row.get(1)?;
            Ok(DirEntry {
                name: basename(&path).to_string(),
                stat: FileStat {
                    id: row.get(0)?,
                    uid: row.get(2)?,
                    gid: row.get(3)?,
                    mode: row.get(4)?,
                    atime: row.get(5)?,
                    mtime: row.get(6)?,
                    ctime: row.get(7)?,
                    size: row.get::<_, i64>(8)? as u64,
                    nlink: row.get(9)?,
                },
            })
        })?;
        let mut entries: Vec<DirEntry> = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
