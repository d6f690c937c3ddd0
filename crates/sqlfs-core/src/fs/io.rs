//! The I/O path: open handles, byte-range reads and writes.

use super::SqlFs;
use crate::error::{FsError, FsResult};
use crate::path::is_root;
use crate::types::{FileId, PathInfo};

impl SqlFs {
    /// Resolve a path to an open handle: the id of its file row.
    pub fn open(&self, path: &str) -> FsResult<FileId> {
        if is_root(path) {
            return Err(FsError::NotFound(path.to_string()));
        }
        let info: PathInfo = self.require(path)?;
        if info.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }
        Ok(info.file_id)
    }

    /// Read up to `size` bytes at `offset` from the file row behind an
    /// open handle. Empty at or past end-of-file.
    pub fn read(&self, file_id: FileId, offset: u64, size: usize) -> FsResult<Vec<u8>> {
        let mut buf: Vec<u8> = vec![0u8; size];
        let n: usize = self.db.read_blob(file_id, offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `data` at `offset`, returning the number of bytes written.
    ///
    /// When the whole range lies inside the current content the write
    /// goes through an in-place blob handle; otherwise the row is
    /// rewritten with the grown content, zero-filling any gap past the
    /// old end.
    pub fn write(&self, path: &str, offset: u64, data: &[u8]) -> FsResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let info: PathInfo = self.require(path)?;
        if offset + data.len() as u64 <= info.size {
            self.db.write_blob(info.file_id, offset, data)?;
        } else {
            self.db.rewrite_file(&info, offset, data)?;
        }
        Ok(data.len())
    }
}
