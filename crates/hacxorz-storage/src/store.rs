//! The remote persistence contract consumed by the chat core.
//!
//! `ChatStore` is the seam between session/message bookkeeping and whatever
//! actually keeps the rows. `SqliteChatStore` is the local implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use hacxorz_core::error::HacxorzError;
use hacxorz_core::types::{Message, OwnerId, Session, SessionId, SessionUpdate};

use crate::db::Database;
use crate::repository::{MessageRepository, SessionRepository};

/// Owner-scoped session and message persistence.
///
/// Every call may fail; callers treat any error as "remote unavailable".
/// Sessions returned by `list_sessions` carry `message_count == 0`; use
/// `count_messages` to fill it in.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_session(&self, owner: &OwnerId, title: &str) -> Result<Session, HacxorzError>;

    /// Live sessions of `owner`, most recently updated first.
    async fn list_sessions(&self, owner: &OwnerId) -> Result<Vec<Session>, HacxorzError>;

    async fn update_session(
        &self,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<(), HacxorzError>;

    /// Remove a session and all of its messages.
    async fn delete_session(&self, id: &SessionId) -> Result<(), HacxorzError>;

    /// Messages in creation order.
    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, HacxorzError>;

    async fn count_messages(&self, session_id: &SessionId) -> Result<u64, HacxorzError>;

    /// Persist one message. Also refreshes the session's `updated_at`.
    async fn save_message(&self, message: &Message) -> Result<(), HacxorzError>;

    /// Remove every message of a session, keeping the session itself.
    async fn delete_messages(&self, session_id: &SessionId) -> Result<u64, HacxorzError>;
}

/// SQLite-backed `ChatStore`.
pub struct SqliteChatStore {
    sessions: SessionRepository,
    messages: MessageRepository,
}

impl SqliteChatStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            sessions: SessionRepository::new(Arc::clone(&db)),
            messages: MessageRepository::new(db),
        }
    }

    /// Open an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, HacxorzError> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_session(&self, owner: &OwnerId, title: &str) -> Result<Session, HacxorzError> {
        let session = self.sessions.create(owner, title)?;
        debug!(session_id = %session.id, owner = %owner, "Session created");
        Ok(session)
    }

    async fn list_sessions(&self, owner: &OwnerId) -> Result<Vec<Session>, HacxorzError> {
        self.sessions.list_for_owner(owner)
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<(), HacxorzError> {
        self.sessions.update(id, &update)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), HacxorzError> {
        self.sessions.tombstone(id)?;
        debug!(session_id = %id, "Session deleted");
        Ok(())
    }

    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, HacxorzError> {
        self.messages.list_for_session(session_id)
    }

    async fn count_messages(&self, session_id: &SessionId) -> Result<u64, HacxorzError> {
        self.messages.count_for_session(session_id)
    }

    async fn save_message(&self, message: &Message) -> Result<(), HacxorzError> {
        self.messages.save(message)
    }

    async fn delete_messages(&self, session_id: &SessionId) -> Result<u64, HacxorzError> {
        let removed = self.messages.tombstone_for_session(session_id)?;
        debug!(session_id = %session_id, removed, "Messages cleared");
        Ok(removed)
    }
}
