//! Connection wrapper owning the prepared-statement cache.
//!
//! Every statement the filesystem runs is compiled once and reused via
//! the connection's statement cache. A cached handle resets itself when
//! dropped, so no bindings survive across calls. Statements are not
//! reentrant; [`Db`] is deliberately not `Sync` and all operations run
//! serially on the owning thread.

use std::path::Path;

use rusqlite::{CachedStatement, Connection, Transaction};

use crate::error::FsResult;
use crate::schema;
use crate::types::PathId;

/// Sized to hold the full statement set without eviction.
const STATEMENT_CACHE_CAPACITY: usize = 32;

/// The single store connection plus its statement cache.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open (creating if needed) the database at `path`, enable
    /// write-ahead logging, and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> FsResult<Db> {
        Db::init(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> FsResult<Db> {
        Db::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> FsResult<Db> {
        // journal_mode returns the resulting mode as a row.
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(schema::CREATE_TABLES)?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Ok(Db { conn })
    }

    /// Fetch a statement from the cache, compiling it on first use.
    pub(crate) fn stmt(&self, sql: &str) -> FsResult<CachedStatement<'_>> {
        Ok(self.conn.prepare_cached(sql)?)
    }

    /// Begin a transaction for a multi-row mutation. Rolls back on drop
    /// unless committed.
    pub(crate) fn begin(&self) -> FsResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Row id assigned by the most recent insert.
    pub(crate) fn last_insert_id(&self) -> PathId {
        self.conn.last_insert_rowid()
    }

    /// Best-effort WAL checkpoint, called at unmount. The pragma
    /// reports its outcome as a row.
    pub fn checkpoint(&self) -> FsResult<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_row| Ok(()))?;
        Ok(())
    }
}
