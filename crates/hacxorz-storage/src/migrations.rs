//! Database schema migrations.
//!
//! Applies the chat schema: `chat_sessions`, `messages`, and the
//! `schema_migrations` bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use hacxorz_core::error::HacxorzError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), HacxorzError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| HacxorzError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| HacxorzError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: chat_schema");
    }

    Ok(())
}

/// Version 1: sessions and messages with tombstone columns.
///
/// Timestamps are epoch milliseconds. `messages.seq` records insertion order
/// and breaks `created_at` ties.
fn apply_v1(conn: &Connection) -> Result<(), HacxorzError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            owner_id    TEXT NOT NULL,
            title       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            deleted_at  INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_chat_sessions_owner
            ON chat_sessions (owner_id, updated_at DESC)
            WHERE deleted_at IS NULL;

        CREATE TABLE IF NOT EXISTS messages (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            session_id  TEXT NOT NULL,
            sender      TEXT NOT NULL
                        CHECK (sender IN ('user', 'assistant', 'ai')),
            content     TEXT NOT NULL,
            confidence  REAL,
            created_at  INTEGER NOT NULL,
            deleted_at  INTEGER,
            FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages (session_id, created_at ASC, seq ASC)
            WHERE deleted_at IS NULL;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'chat_schema');
        ",
    )
    .map_err(|e| HacxorzError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_sender_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO chat_sessions (id, owner_id, title, created_at, updated_at)
             VALUES ('s', 'o', 't', 0, 0)",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO messages (id, session_id, sender, content, created_at)
             VALUES ('m', 's', 'robot', 'x', 0)",
            [],
        );
        assert!(bad.is_err());
    }
}
