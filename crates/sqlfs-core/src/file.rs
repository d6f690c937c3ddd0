//! File store: content rows, link counts, and incremental blob I/O.
//!
//! A blob handle is a byte-addressable cursor into the `content` column
//! of one row. Handles close on drop, including error paths; a leaked
//! handle would block later writes to the same row. A handle can never
//! grow the blob, so writes past the current size take the row-rewrite
//! path instead.

use std::io::{Read, Seek, SeekFrom, Write};

use rusqlite::{params, DatabaseName};

use crate::db::Db;
use crate::error::FsResult;
use crate::schema;
use crate::types::{FileId, PathInfo};

impl Db {
    /// Insert a file row with the supplied content, returning the new
    /// row id. Empty content is stored as NULL; `nlink` defaults to 1.
    pub fn insert_file(&self, content: &[u8], dev: u32) -> FsResult<FileId> {
        let blob: Option<&[u8]> = if content.is_empty() {
            None
        } else {
            Some(content)
        };
        let mut stmt = self.stmt(schema::INSERT_FILE)?;
        stmt.execute(params![blob, dev, content.len() as i64])?;
        Ok(self.last_insert_id())
    }

    pub fn inc_nlink(&self, file_id: FileId) -> FsResult<()> {
        self.stmt(schema::INCREMENT_NLINK_BY_ID)?.execute([file_id])?;
        Ok(())
    }

    pub fn dec_nlink(&self, file_id: FileId) -> FsResult<()> {
        self.stmt(schema::DECREMENT_NLINK_BY_ID)?.execute([file_id])?;
        Ok(())
    }

    /// Current hard-link count of a file row.
    pub fn nlink(&self, file_id: FileId) -> FsResult<i64> {
        let mut stmt = self.stmt(schema::SELECT_NLINK_BY_ID)?;
        Ok(stmt.query_row([file_id], |row| row.get(0))?)
    }

    /// Remove a file row. The caller has already driven `nlink` to
    /// zero.
    pub fn delete_file(&self, file_id: FileId) -> FsResult<()> {
        self.stmt(schema::DELETE_FILE_BY_ID)?.execute([file_id])?;
        Ok(())
    }

    /// Shrink a file to `new_size`, cutting the content to match.
    /// Growing is a no-op: the statement predicate only fires when
    /// `new_size` is below the current size.
    pub fn shrink_file(&self, file_id: FileId, new_size: u64) -> FsResult<()> {
        let mut stmt = self.stmt(schema::SHRINK_FILE_BY_ID)?;
        stmt.execute(params![new_size as i64, file_id])?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `offset` through a read-only
    /// blob handle. Returns the number of bytes read; zero at or past
    /// the end of the blob.
    pub fn read_blob(&self, file_id: FileId, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        let mut blob = match self
            .conn
            .blob_open(DatabaseName::Main, "files", "content", file_id, true)
        {
            Ok(blob) => blob,
            Err(err) => {
                // A NULL content column (empty file) has no blob to open.
                if self.content_is_null(file_id)? {
                    return Ok(0);
                }
                return Err(err.into());
            }
        };
        let blob_len: u64 = blob.size() as u64;
        if offset >= blob_len {
            return Ok(0);
        }
        let want: usize = buf.len().min((blob_len - offset) as usize);
        blob.seek(SeekFrom::Start(offset))?;
        blob.read_exact(&mut buf[..want])?;
        Ok(want)
    }

    /// Overwrite bytes inside the existing blob through a read-write
    /// handle. The whole range must already lie within the blob.
    pub fn write_blob(&self, file_id: FileId, offset: u64, data: &[u8]) -> FsResult<()> {
        let mut blob = self
            .conn
            .blob_open(DatabaseName::Main, "files", "content", file_id, false)?;
        blob.seek(SeekFrom::Start(offset))?;
        blob.write_all(data)?;
        Ok(())
    }

    fn content_is_null(&self, file_id: FileId) -> FsResult<bool> {
        let mut stmt = self.stmt(schema::SELECT_CONTENT_IS_NULL)?;
        Ok(stmt.query_row([file_id], |row| row.get(0))?)
    }

    /// Full content of a file row; NULL reads as empty.
    pub fn file_content(&self, file_id: FileId) -> FsResult<Vec<u8>> {
        let mut stmt = self.stmt(schema::SELECT_CONTENT_BY_FILE_ID)?;
        let content: Option<Vec<u8>> = stmt.query_row([file_id], |row| row.get(0))?;
        Ok(content.unwrap_or_default())
    }

    /// Materialize the content for a write that extends the blob:
    /// copy the old content into the prefix, zero-fill any gap up to
    /// `offset`, overlay `data`, and update content and size in one
    /// statement.
    pub fn rewrite_file(&self, info: &PathInfo, offset: u64, data: &[u8]) -> FsResult<()> {
        let new_size: usize = offset as usize + data.len();
        let mut content: Vec<u8> = vec![0u8; new_size];
        if info.size > 0 {
            let old: Vec<u8> = self.file_content(info.file_id)?;
            let keep: usize = old.len().min(new_size);
            content[..keep].copy_from_slice(&old[..keep]);
        }
        content[offset as usize..].copy_from_slice(data);
        let mut stmt = self.stmt(schema::UPDATE_CONTENT_BY_ID)?;
        stmt.execute(params![content, new_size as i64, info.file_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_file(content: &[u8]) -> (Db, FileId) {
        let db: Db = Db::open_in_memory().unwrap();
        let id: FileId = db.insert_file(content, 0).unwrap();
        (db, id)
    }

    #[test]
    fn empty_content_is_stored_as_null() {
        let (db, id) = db_with_file(b"");
        let is_null: bool = db
            .conn
            .query_row("select content is null from files where id = ?1", [id], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(is_null);
        assert_eq!(db.file_content(id).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn blob_read_respects_bounds() {
        let (db, id) = db_with_file(b"hello world");
        let mut buf = [0u8; 5];
        assert_eq!(db.read_blob(id, 0, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");

        // Short read at the tail.
        assert_eq!(db.read_blob(id, 8, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"rld");

        // At and past the end.
        assert_eq!(db.read_blob(id, 11, &mut buf).unwrap(), 0);
        assert_eq!(db.read_blob(id, 100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_of_null_content_is_empty() {
        let (db, id) = db_with_file(b"");
        let mut buf = [0u8; 8];
        assert_eq!(db.read_blob(id, 0, &mut buf).unwrap(), 0);
        // A bogus file id is still an error, not an empty read.
        assert!(db.read_blob(id + 1, 0, &mut buf).is_err());
    }

    #[test]
    fn blob_write_overwrites_in_place() {
        let (db, id) = db_with_file(b"hello world");
        db.write_blob(id, 6, b"blobs").unwrap();
        assert_eq!(db.file_content(id).unwrap(), b"hello blobs");
    }

    #[test]
    fn rewrite_zero_fills_the_gap() {
        let (db, id) = db_with_file(b"abc");
        let info = PathInfo {
            id: 0,
            mode: libc::S_IFREG | 0o644,
            file_id: id,
            size: 3,
        };
        db.rewrite_file(&info, 6, b"xy").unwrap();
        assert_eq!(db.file_content(id).unwrap(), b"abc\0\0\0xy");
        let size: i64 = db
            .conn
            .query_row("select size from files where id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(size, 8);
    }

    #[test]
    fn shrink_cuts_content_and_ignores_growth() {
        let (db, id) = db_with_file(b"hello world");
        db.shrink_file(id, 100).unwrap();
        assert_eq!(db.file_content(id).unwrap(), b"hello world");

        db.shrink_file(id, 5).unwrap();
        assert_eq!(db.file_content(id).unwrap(), b"hello");
        let size: i64 = db
            .conn
            .query_row("select size from files where id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(size, 5);
    }

    #[test]
    fn nlink_bookkeeping() {
        let (db, id) = db_with_file(b"x");
        assert_eq!(db.nlink(id).unwrap(), 1);
        db.inc_nlink(id).unwrap();
        assert_eq!(db.nlink(id).unwrap(), 2);
        db.dec_nlink(id).unwrap();
        db.dec_nlink(id).unwrap();
        assert_eq!(db.nlink(id).unwrap(), 0);
        db.delete_file(id).unwrap();
        assert!(db.nlink(id).is_err());
    }
}
