//! Repository implementations for SQLite-backed persistence.
//!
//! Provides SessionRepository and MessageRepository that operate on the
//! Database struct using raw SQL. Deletes are tombstones: rows get a
//! `deleted_at` stamp and drop out of every read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use hacxorz_core::error::HacxorzError;
use hacxorz_core::types::{
    Confidence, Message, MessageId, OwnerId, Sender, Session, SessionId, SessionUpdate,
};

use crate::db::Database;

/// Repository for chat sessions.
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new session owned by `owner`.
    pub fn create(&self, owner: &OwnerId, title: &str) -> Result<Session, HacxorzError> {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, owner_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    session.id.to_string(),
                    owner.as_str(),
                    session.title,
                    now.timestamp_millis(),
                    now.timestamp_millis(),
                ],
            )
            .map_err(|e| HacxorzError::Storage(format!("Failed to create session: {}", e)))?;
            Ok(())
        })?;
        Ok(session)
    }

    /// Find a live session by ID.
    pub fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, HacxorzError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, created_at, updated_at
                 FROM chat_sessions WHERE id = ?1 AND deleted_at IS NULL",
                rusqlite::params![id.to_string()],
                |row| Ok(row_to_session(row)),
            )
            .optional()
            .map_err(|e| HacxorzError::Storage(e.to_string()))?
            .transpose()
        })
    }

    /// List an owner's live sessions, most recently updated first.
    pub fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<Session>, HacxorzError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at
                     FROM chat_sessions
                     WHERE owner_id = ?1 AND deleted_at IS NULL
                     ORDER BY updated_at DESC, created_at DESC",
                )
                .map_err(|e| HacxorzError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![owner.as_str()], |row| {
                    Ok(row_to_session(row))
                })
                .map_err(|e| HacxorzError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let session = row.map_err(|e| HacxorzError::Storage(e.to_string()))??;
                sessions.push(session);
            }
            Ok(sessions)
        })
    }

    /// Apply a partial update. Fails if the session is missing or tombstoned.
    pub fn update(&self, id: &SessionId, update: &SessionUpdate) -> Result<(), HacxorzError> {
        let updated_at = update.updated_at.map(|t| t.timestamp_millis());
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_sessions
                 SET title = COALESCE(?2, title),
                     updated_at = COALESCE(?3, updated_at)
                 WHERE id = ?1 AND deleted_at IS NULL",
                rusqlite::params![id.to_string(), update.title, updated_at],
            )
            .map_err(|e| HacxorzError::Storage(format!("Failed to update session: {}", e)))
        })?;
        if changed == 0 {
            return Err(HacxorzError::Storage(format!("session not found: {}", id)));
        }
        Ok(())
    }

    /// Tombstone a session and every message it owns.
    pub fn tombstone(&self, id: &SessionId) -> Result<(), HacxorzError> {
        let now = Utc::now().timestamp_millis();
        self.db.with_tx(|tx| {
            let changed = tx
                .execute(
                    "UPDATE chat_sessions SET deleted_at = ?2
                     WHERE id = ?1 AND deleted_at IS NULL",
                    rusqlite::params![id.to_string(), now],
                )
                .map_err(|e| HacxorzError::Storage(format!("Failed to delete session: {}", e)))?;
            if changed == 0 {
                return Err(HacxorzError::Storage(format!("session not found: {}", id)));
            }
            tx.execute(
                "UPDATE messages SET deleted_at = ?2
                 WHERE session_id = ?1 AND deleted_at IS NULL",
                rusqlite::params![id.to_string(), now],
            )
            .map_err(|e| HacxorzError::Storage(format!("Failed to delete messages: {}", e)))?;
            Ok(())
        })
    }
}

/// Repository for chat messages.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a message and bump the owning session's `updated_at`.
    ///
    /// Fails if the owning session is missing or tombstoned.
    pub fn save(&self, message: &Message) -> Result<(), HacxorzError> {
        self.db.with_tx(|tx| {
            let inserted = tx
                .execute(
                    "INSERT INTO messages (id, session_id, sender, content, confidence, created_at)
                     SELECT ?1, ?2, ?3, ?4, ?5, ?6
                     WHERE EXISTS (
                         SELECT 1 FROM chat_sessions WHERE id = ?2 AND deleted_at IS NULL
                     )",
                    rusqlite::params![
                        message.id.to_string(),
                        message.session_id.to_string(),
                        message.sender.as_str(),
                        message.text,
                        message.confidence.map(|c| c.value()),
                        message.created_at.timestamp_millis(),
                    ],
                )
                .map_err(|e| HacxorzError::Storage(format!("Failed to save message: {}", e)))?;
            if inserted == 0 {
                return Err(HacxorzError::Storage(format!(
                    "session not found: {}",
                    message.session_id
                )));
            }
            tx.execute(
                "UPDATE chat_sessions SET updated_at = MAX(updated_at, ?2) WHERE id = ?1",
                rusqlite::params![
                    message.session_id.to_string(),
                    message.created_at.timestamp_millis()
                ],
            )
            .map_err(|e| HacxorzError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    /// Live messages of a session in chronological order, ties by insertion.
    pub fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<Message>, HacxorzError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, sender, content, confidence, created_at
                     FROM messages
                     WHERE session_id = ?1 AND deleted_at IS NULL
                     ORDER BY created_at ASC, seq ASC",
                )
                .map_err(|e| HacxorzError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| HacxorzError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| HacxorzError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Count live messages of a session.
    pub fn count_for_session(&self, session_id: &SessionId) -> Result<u64, HacxorzError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE session_id = ?1 AND deleted_at IS NULL",
                    rusqlite::params![session_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(|e| HacxorzError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    /// Tombstone every live message of a session. Returns how many were hit.
    pub fn tombstone_for_session(&self, session_id: &SessionId) -> Result<u64, HacxorzError> {
        let now = Utc::now().timestamp_millis();
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE messages SET deleted_at = ?2
                     WHERE session_id = ?1 AND deleted_at IS NULL",
                    rusqlite::params![session_id.to_string(), now],
                )
                .map_err(|e| HacxorzError::Storage(format!("Failed to clear messages: {}", e)))?;
            Ok(changed as u64)
        })
    }
}

// =============================================================================
// Row mapping helpers
// =============================================================================

fn parse_uuid(raw: &str) -> Result<Uuid, HacxorzError> {
    Uuid::parse_str(raw).map_err(|e| HacxorzError::Storage(format!("Invalid UUID '{}': {}", raw, e)))
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, HacxorzError> {
    let id: String = row.get(0).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let title: String = row.get(1).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(2).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let updated_at: i64 = row.get(3).map_err(|e| HacxorzError::Storage(e.to_string()))?;

    Ok(Session {
        id: SessionId(parse_uuid(&id)?),
        title,
        created_at: millis_to_datetime(created_at),
        updated_at: millis_to_datetime(updated_at),
        message_count: 0,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, HacxorzError> {
    let id: String = row.get(0).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let session_id: String = row.get(1).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let sender: String = row.get(2).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let text: String = row.get(3).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let confidence: Option<f64> = row.get(4).map_err(|e| HacxorzError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(5).map_err(|e| HacxorzError::Storage(e.to_string()))?;

    let sender: Sender = sender.parse().map_err(HacxorzError::Storage)?;
    // Only assistant rows carry a score.
    let confidence = match sender {
        Sender::Assistant => confidence.map(Confidence::new),
        Sender::User => None,
    };

    Ok(Message {
        id: MessageId(parse_uuid(&id)?),
        session_id: SessionId(parse_uuid(&session_id)?),
        sender,
        text,
        created_at: millis_to_datetime(created_at),
        confidence,
    })
}
