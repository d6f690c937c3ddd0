//! Path index: resolves absolute path strings to row identifiers.
//!
//! Paths are stored whole. Directory enumeration uses `parent_id`, so
//! string equality is the only lookup predicate; nothing walks the tree
//! component by component. The implicit root short-circuits every
//! lookup.

use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::FsResult;
use crate::schema;
use crate::types::{unix_now, FileId, PathId, PathInfo, ROOT_PATH_ID};

/// True when `path` names the implicit root directory.
pub fn is_root(path: &str) -> bool {
    path == "/"
}

/// Parent directory of an absolute path; "/" for top-level names and
/// for the root itself.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Final component of an absolute path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl Db {
    /// Resolve a path to its row id. The root resolves to id 0 without
    /// touching the store.
    pub fn path_id(&self, path: &str) -> FsResult<Option<PathId>> {
        if is_root(path) {
            return Ok(Some(ROOT_PATH_ID));
        }
        let mut stmt = self.stmt(schema::SELECT_PATH_ID_BY_PATH)?;
        Ok(stmt.query_row([path], |row| row.get(0)).optional()?)
    }

    /// Resolve a path to its id, mode, file reference, and current
    /// size. The root yields the all-zero record.
    pub fn path_info(&self, path: &str) -> FsResult<Option<PathInfo>> {
        if is_root(path) {
            return Ok(Some(PathInfo::root()));
        }
        let mut stmt = self.stmt(schema::SELECT_PATH_INFO_BY_PATH)?;
        let info = stmt
            .query_row([path], |row| {
                Ok(PathInfo {
                    id: row.get(0)?,
                    mode: row.get(1)?,
                    file_id: row.get::<_, Option<FileId>>(2)?.unwrap_or(0),
                    size: row.get::<_, i64>(3)? as u64,
                })
            })
            .optional()?;
        Ok(info)
    }

    /// Reverse lookup: the path string for a row id. Id 0 maps to "/".
    pub fn path_by_id(&self, id: PathId) -> FsResult<Option<String>> {
        if id == ROOT_PATH_ID {
            return Ok(Some("/".to_string()));
        }
        let mut stmt = self.stmt(schema::SELECT_PATH_BY_ID)?;
        Ok(stmt.query_row([id], |row| row.get(0)).optional()?)
    }

    /// Insert one path row beneath the given parent, stamping all three
    /// timestamps with the current time.
    pub fn insert_path(
        &self,
        path: &str,
        parent_id: PathId,
        uid: u32,
        gid: u32,
        mode: u32,
        file_id: FileId,
    ) -> FsResult<()> {
        let now: i64 = unix_now();
        let mut stmt = self.stmt(schema::INSERT_PATH)?;
        stmt.execute(params![path, parent_id, uid, gid, mode, now, now, now, file_id])?;
        Ok(())
    }

    pub fn delete_path(&self, id: PathId) -> FsResult<()> {
        self.stmt(schema::DELETE_PATH_BY_ID)?.execute([id])?;
        Ok(())
    }

    /// Move one row to a new path string under a new parent.
    pub fn rename_path(&self, id: PathId, new_path: &str, new_parent: PathId) -> FsResult<()> {
        let mut stmt = self.stmt(schema::UPDATE_PATH_NAME_BY_ID)?;
        stmt.execute(params![new_path, new_parent, id])?;
        Ok(())
    }

    /// Rewrite every path strictly below `old_prefix` to live below
    /// `new_prefix`. Descendant row ids, and therefore their
    /// `parent_id` chains, are untouched.
    pub fn rewrite_descendant_paths(&self, old_prefix: &str, new_prefix: &str) -> FsResult<()> {
        let mut stmt = self.stmt(schema::UPDATE_DESCENDANT_PATHS)?;
        stmt.execute(params![old_prefix, new_prefix])?;
        Ok(())
    }

    /// Number of direct children of the directory row `id`.
    pub fn count_children(&self, id: PathId) -> FsResult<i64> {
        let mut stmt = self.stmt(schema::COUNT_CHILDREN_BY_PARENT_ID)?;
        Ok(stmt.query_row([id], |row| row.get(0))?)
    }

    pub fn set_mode(&self, id: PathId, mode: u32) -> FsResult<()> {
        self.stmt(schema::UPDATE_MODE_BY_ID)?
            .execute(params![mode, id])?;
        Ok(())
    }

    pub fn set_owner(&self, id: PathId, uid: u32, gid: u32) -> FsResult<()> {
        self.stmt(schema::UPDATE_OWNER_BY_ID)?
            .execute(params![uid, gid, id])?;
        Ok(())
    }

    pub fn set_times(&self, id: PathId, atime: i64, mtime: i64) -> FsResult<()> {
        self.stmt(schema::UPDATE_TIMES_BY_ID)?
            .execute(params![atime, mtime, id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_walks_up_one_level() {
        assert_eq!(parent_of("/a/b/c"), "/a/b");
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/"), "/");
    }

    #[test]
    fn basename_is_final_component() {
        assert_eq!(basename("/a/b/c"), "c");
        assert_eq!(basename("/a"), "a");
    }

    #[test]
    fn root_is_special_cased() {
        let db: Db = Db::open_in_memory().unwrap();
        assert_eq!(db.path_id("/").unwrap(), Some(ROOT_PATH_ID));
        assert_eq!(db.path_by_id(ROOT_PATH_ID).unwrap().as_deref(), Some("/"));
        let info: PathInfo = db.path_info("/").unwrap().unwrap();
        assert_eq!(info.id, ROOT_PATH_ID);
        assert_eq!(info.file_id, 0);
    }

    #[test]
    fn missing_paths_resolve_to_none() {
        let db: Db = Db::open_in_memory().unwrap();
        assert_eq!(db.path_id("/missing").unwrap(), None);
        assert!(db.path_info("/missing").unwrap().is_none());
        assert_eq!(db.path_by_id(42).unwrap(), None);
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let db: Db = Db::open_in_memory().unwrap();
        db.insert_path("/d", ROOT_PATH_ID, 1000, 1000, libc::S_IFDIR | 0o755, 0)
            .unwrap();
        let id: PathId = db.path_id("/d").unwrap().unwrap();
        assert_eq!(db.path_by_id(id).unwrap().as_deref(), Some("/d"));
        let info: PathInfo = db.path_info("/d").unwrap().unwrap();
        assert!(info.is_dir());
        assert_eq!(info.size, 0);
    }
}
