//! SQLite handle shared by the repositories.
//!
//! One connection behind a `Mutex`; every repository call locks it for the
//! length of a closure. Opening a handle always brings the schema up to date.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::info;

use hacxorz_core::error::HacxorzError;

use crate::migrations;

/// How long a write waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn storage_err(context: &str, e: rusqlite::Error) -> HacxorzError {
    HacxorzError::Storage(format!("{}: {}", context, e))
}

/// The chat database. `Connection` is not `Sync`, hence the mutex.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file at `path`, creating parent
    /// directories, enabling WAL, and applying pending migrations.
    pub fn new(path: &Path) -> Result<Self, HacxorzError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| storage_err("Failed to open database", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| storage_err("Failed to enable WAL", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| storage_err("Failed to set synchronous", e))?;
        let db = Self::prepare(conn)?;
        info!(path = %path.display(), "Chat database opened");
        Ok(db)
    }

    /// A private database that lives as long as the handle.
    pub fn in_memory() -> Result<Self, HacxorzError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| storage_err("Failed to open in-memory database", e))?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, HacxorzError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| storage_err("Failed to enable foreign keys", e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| storage_err("Failed to set busy timeout", e))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with the connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, HacxorzError>
    where
        F: FnOnce(&Connection) -> Result<T, HacxorzError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| HacxorzError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `f` inside a transaction, committing only if it returns `Ok`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, HacxorzError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, HacxorzError>,
    {
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| storage_err("Failed to begin transaction", e))?;
            let value = f(&tx)?;
            tx.commit()
                .map_err(|e| storage_err("Failed to commit transaction", e))?;
            Ok(value)
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
