//! Name operations: create, unlink, rename, hard-link, symlink.

use super::SqlFs;
use crate::error::{FsError, FsResult};
use crate::path::parent_of;
use crate::types::{FileId, PathId, PathInfo};

impl SqlFs {
    /// Create an empty regular file.
    pub fn mknod(&self, path: &str, mode: u32, dev: u32, uid: u32, gid: u32) -> FsResult<()> {
        self.require_absent(path)?;
        let tx = self.db.begin()?;
        let file_id: FileId = self.db.insert_file(&[], dev)?;
        self.insert_entry(path, (mode & 0o7777) | libc::S_IFREG, file_id, uid, gid)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove one name. The file row goes with it when this was the
    /// last link.
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        let info: PathInfo = self.require(path)?;
        if info.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }
        let tx = self.db.begin()?;
        self.remove_name(&info)?;
        tx.commit()?;
        Ok(())
    }

    /// Drop one name and its share of the link count, reclaiming the
    /// file row when the last name goes away. Runs inside the caller's
    /// transaction.
    fn remove_name(&self, info: &PathInfo) -> FsResult<()> {
        self.db.delete_path(info.id)?;
        self.db.dec_nlink(info.file_id)?;
        if self.db.nlink(info.file_id)? == 0 {
            self.db.delete_file(info.file_id)?;
        }
        Ok(())
    }

    /// Move a name. An existing non-directory target is replaced.
    /// Renaming a directory rewrites every descendant row in the same
    /// transaction, since descendants embed the full path string.
    pub fn rename(&self, old_path: &str, new_path: &str, _flags: u32) -> FsResult<()> {
        let info: PathInfo = self.require(old_path)?;
        if old_path == new_path {
            return Ok(());
        }
        let new_parent: &str = parent_of(new_path);
        let new_parent_id: PathId = self
            .db
            .path_id(new_parent)?
            .ok_or_else(|| FsError::NotFound(new_parent.to_string()))?;

        let tx = self.db.begin()?;
        if let Some(target) = self.db.path_info(new_path)? {
            if target.is_dir() {
                return Err(FsError::IsDirectory(new_path.to_string()));
            }
            self.remove_name(&target)?;
        }
        self.db.rename_path(info.id, new_path, new_parent_id)?;
        if info.is_dir() {
            self.db.rewrite_descendant_paths(old_path, new_path)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Add a second name for an existing file's content.
    pub fn link(&self, old_path: &str, new_path: &str, uid: u32, gid: u32) -> FsResult<()> {
        self.require_absent(new_path)?;
        let info: PathInfo = self.require(old_path)?;
        let tx = self.db.begin()?;
        self.insert_entry(new_path, info.mode, info.file_id, uid, gid)?;
        self.db.inc_nlink(info.file_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Create a symbolic link. The target string is stored as the file
    /// content with a terminating NUL byte.
    pub fn symlink(&self, target: &str, link_path: &str, uid: u32, gid: u32) -> FsResult<()> {
        self.require_absent(link_path)?;
        let mut content: Vec<u8> = target.as_bytes().to_vec();
        content.push(0);
        let tx = self.db.begin()?;
        let file_id: FileId = self.db.insert_file(&content, 0)?;
        self.insert_entry(link_path, libc::S_IFLNK | 0o755, file_id, uid, gid)?;
        tx.commit()?;
        Ok(())
    }

    /// Read a link's stored target bytes, trailing NUL included.
    pub fn read_link(&self, path: &str) -> FsResult<Vec<u8>> {
        let info: PathInfo = self.require(path)?;
        let mut buf: Vec<u8> = vec![0u8; info.size as usize];
        let n: usize = self.db.read_blob(info.file_id, 0, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}
