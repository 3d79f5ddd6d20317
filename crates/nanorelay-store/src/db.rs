use std::path::{Path, PathBuf};

use nanorelay_core::PaymentError;
use rusqlite::Connection;

/// Handle to the persistent store. Holds only the file path: every operation
/// opens a fresh connection, runs one short transaction, and closes it again
/// (§5 — "the DB handle is opened and closed per call").
///
/// Named tables (§6):
///   config(key TEXT PRIMARY KEY, value TEXT)
///   payments(id TEXT PRIMARY KEY, account TEXT, amount TEXT, block_hash TEXT)
///   wallet(id TEXT, time INTEGER)   -- rowid = wallet index
#[derive(Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (creating if necessary) the store at `path`, ensuring the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PaymentError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Self::connect(&db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE IF NOT EXISTS payments (
                 id TEXT PRIMARY KEY,
                 account TEXT NOT NULL,
                 amount TEXT NOT NULL,
                 block_hash TEXT
             );
             CREATE TABLE IF NOT EXISTS wallet (id TEXT NOT NULL, time INTEGER);",
        )
        .map_err(|e| PaymentError::Internal(format!("creating schema: {e}")))?;
        Ok(Self { db_path })
    }

    pub(crate) fn connect(path: &Path) -> Result<Connection, PaymentError> {
        let conn = Connection::open(path)
            .map_err(|e| PaymentError::Internal(format!("opening {}: {e}", path.display())))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PaymentError::Internal(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| PaymentError::Internal(e.to_string()))?;
        Ok(conn)
    }

    pub(crate) fn conn(&self) -> Result<Connection, PaymentError> {
        Self::connect(&self.db_path)
    }
}
