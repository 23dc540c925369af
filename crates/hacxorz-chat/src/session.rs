//! Session manager: owns the active session and its message store.
//!
//! Remote calls happen outside the state lock; results are applied in one
//! locked step. Every operation that replaces the message sequence bumps
//! `load_seq`, and a load only applies if its sequence number is still
//! the latest when it settles. Deleting the session being loaded also
//! bumps it, so a tombstoned session never becomes active.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use hacxorz_core::types::{Message, OwnerId, Session, SessionId, SessionUpdate};
use hacxorz_storage::ChatStore;

use crate::error::ChatError;
use crate::history::truncate_title;
use crate::identity::{require_owner, IdentityProvider};
use crate::store::MessageStore;

/// Identifies the sequence a reply was requested against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyTag {
    pub session_id: SessionId,
    pub generation: u64,
}

/// Result of `select_session`.
#[derive(Debug)]
pub enum SelectOutcome {
    Loaded(Session),
    /// A newer session operation started while this load was in flight.
    Superseded,
}

/// Result of `delete_session`.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// A non-active session was removed.
    Removed,
    /// The active session was removed and a fresh one took its place.
    Replaced(Session),
    /// The active session was removed but no replacement could be created.
    Orphaned(ChatError),
}

/// Snapshot of the message sequence.
#[derive(Clone, Debug, Default)]
pub struct MessagesSnapshot {
    pub session_id: Option<SessionId>,
    pub generation: u64,
    pub messages: Vec<Message>,
}

#[derive(Default)]
struct SessionState {
    active: Option<Session>,
    messages: MessageStore,
    load_seq: u64,
    /// Target of the newest in-flight `select_session`.
    loading: Option<SessionId>,
}

pub struct SessionManager {
    store: Arc<dyn ChatStore>,
    identity: Arc<dyn IdentityProvider>,
    default_title: String,
    title_max_chars: usize,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn ChatStore>,
        identity: Arc<dyn IdentityProvider>,
        default_title: impl Into<String>,
        title_max_chars: usize,
    ) -> Self {
        Self {
            store,
            identity,
            default_title: default_title.into(),
            title_max_chars,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SessionState>, ChatError> {
        self.state
            .lock()
            .map_err(|e| ChatError::InvalidState(format!("session state lock poisoned: {}", e)))
    }

    fn owner(&self) -> Result<OwnerId, ChatError> {
        require_owner(self.identity.as_ref())
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    /// Find one of the current owner's sessions.
    async fn owned_session(&self, owner: &OwnerId, id: &SessionId) -> Result<Session, ChatError> {
        self.store
            .list_sessions(owner)
            .await?
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or(ChatError::SessionNotFound(*id))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a default-titled session and make it active with an empty
    /// sequence. On failure the previous session stays active.
    pub async fn create_session(&self) -> Result<Session, ChatError> {
        let owner = self.owner()?;
        let session = self
            .store
            .create_session(&owner, &self.default_title)
            .await?;

        let mut state = self.state()?;
        state.load_seq += 1;
        state.loading = None;
        state.active = Some(session.clone());
        state.messages.replace_all(Some(session.id), Vec::new());
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Load `id` and make it active, replacing the sequence wholesale.
    ///
    /// The active session only changes once the load succeeds; on failure
    /// the previous session and its messages stay in place.
    pub async fn select_session(&self, id: &SessionId) -> Result<SelectOutcome, ChatError> {
        let owner = self.owner()?;
        let seq = {
            let mut state = self.state()?;
            state.load_seq += 1;
            state.loading = Some(*id);
            state.load_seq
        };

        // A failure that lost the race to a newer operation is not reported.
        let loaded = async {
            let session = self.owned_session(&owner, id).await?;
            let messages = self.store.load_messages(id).await?;
            Ok::<_, ChatError>((session, messages))
        }
        .await;

        let mut state = self.state()?;
        if state.load_seq != seq {
            debug!(session_id = %id, seq, latest = state.load_seq, "Ignoring superseded load");
            return Ok(SelectOutcome::Superseded);
        }
        state.loading = None;
        let (mut session, messages) = loaded?;
        session.message_count = messages.len() as u64;
        state.active = Some(session.clone());
        state.messages.replace_all(Some(session.id), messages);
        info!(session_id = %id, count = state.messages.len(), "Session loaded");
        Ok(SelectOutcome::Loaded(session))
    }

    /// Delete `id`. Deleting the active session creates a replacement before
    /// returning; until then no session is active.
    pub async fn delete_session(&self, id: &SessionId) -> Result<DeleteOutcome, ChatError> {
        let owner = self.owner()?;
        self.owned_session(&owner, id).await?;
        self.store.delete_session(id).await?;

        let was_active = {
            let mut state = self.state()?;
            let was_active = state.active.as_ref().is_some_and(|s| &s.id == id);
            if state.loading.as_ref() == Some(id) {
                debug!(session_id = %id, "Superseding in-flight load of deleted session");
                state.load_seq += 1;
                state.loading = None;
            }
            if was_active {
                state.load_seq += 1;
                state.active = None;
                state.messages.replace_all(None, Vec::new());
            }
            was_active
        };
        info!(session_id = %id, was_active, "Session deleted");

        if !was_active {
            return Ok(DeleteOutcome::Removed);
        }
        match self.create_session().await {
            Ok(session) => Ok(DeleteOutcome::Replaced(session)),
            Err(e) => {
                warn!(error = %e, "Failed to create replacement session");
                Ok(DeleteOutcome::Orphaned(e))
            }
        }
    }

    /// Retitle `id` from `proposed` if it still has the default title.
    ///
    /// Returns the new title, or `None` if nothing changed.
    pub async fn rename_if_default(
        &self,
        id: &SessionId,
        proposed: &str,
    ) -> Result<Option<String>, ChatError> {
        let local_title = {
            let state = self.state()?;
            state
                .active
                .as_ref()
                .filter(|s| &s.id == id)
                .map(|s| s.title.clone())
        };
        let current_title = match local_title {
            Some(title) => title,
            None => {
                let owner = self.owner()?;
                self.owned_session(&owner, id).await?.title
            }
        };
        if current_title != self.default_title {
            return Ok(None);
        }
        let Some(title) = derive_title(proposed, self.title_max_chars) else {
            return Ok(None);
        };

        self.store
            .update_session(id, SessionUpdate::retitle(title.clone()))
            .await?;

        let mut state = self.state()?;
        if let Some(active) = state.active.as_mut().filter(|s| &s.id == id) {
            active.title = title.clone();
        }
        debug!(session_id = %id, title = %title, "Session renamed");
        Ok(Some(title))
    }

    /// The owner's sessions, newest activity first, with message counts.
    /// A failed count degrades to zero.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, ChatError> {
        let owner = self.owner()?;
        let mut sessions = self.store.list_sessions(&owner).await?;
        for session in &mut sessions {
            session.message_count = match self.store.count_messages(&session.id).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Failed to count messages");
                    0
                }
            };
        }
        Ok(sessions)
    }

    // =========================================================================
    // Message sequence
    // =========================================================================

    /// Append a user message to the active session.
    pub fn append_user(&self, text: &str) -> Result<(Message, ReplyTag), ChatError> {
        let mut state = self.state()?;
        let session_id = state
            .active
            .as_ref()
            .map(|s| s.id)
            .ok_or_else(|| ChatError::InvalidState("no active session".into()))?;
        let message = state
            .messages
            .append_optimistic(Message::user(session_id, text))
            .clone();
        let tag = ReplyTag {
            session_id,
            generation: state.messages.generation(),
        };
        Ok((message, tag))
    }

    /// Whether `tag` still names the active session's current sequence.
    pub fn is_current(&self, tag: ReplyTag) -> Result<bool, ChatError> {
        let state = self.state()?;
        Ok(tag_matches(&state, tag))
    }

    /// Append a reply if the sequence it was requested for is still the
    /// current one. Returns the appended message, or `None` if stale.
    pub fn deliver_reply(&self, tag: ReplyTag, message: Message) -> Result<Option<Message>, ChatError> {
        let mut state = self.state()?;
        if !tag_matches(&state, tag) {
            return Ok(None);
        }
        Ok(Some(state.messages.append_optimistic(message).clone()))
    }

    /// Delete the active session's messages remotely, then locally.
    pub async fn clear_messages(&self) -> Result<u64, ChatError> {
        let session_id = self
            .active_session()?
            .map(|s| s.id)
            .ok_or_else(|| ChatError::InvalidState("no active session".into()))?;
        let removed = self.store.delete_messages(&session_id).await?;

        let mut state = self.state()?;
        if state.messages.session_id() == Some(session_id) {
            state.messages.clear();
        }
        info!(session_id = %session_id, removed, "Chat cleared");
        Ok(removed)
    }

    pub fn active_session(&self) -> Result<Option<Session>, ChatError> {
        Ok(self.state()?.active.clone())
    }

    pub fn snapshot(&self) -> Result<MessagesSnapshot, ChatError> {
        let state = self.state()?;
        Ok(MessagesSnapshot {
            session_id: state.messages.session_id(),
            generation: state.messages.generation(),
            messages: state.messages.messages().to_vec(),
        })
    }

    /// Persist a message. Callers decide how to report failure.
    pub async fn save_message(&self, message: &Message) -> Result<(), ChatError> {
        self.store.save_message(message).await?;
        Ok(())
    }
}

fn tag_matches(state: &SessionState, tag: ReplyTag) -> bool {
    state.active.as_ref().map(|s| s.id) == Some(tag.session_id)
        && state.messages.session_id() == Some(tag.session_id)
        && state.messages.generation() == tag.generation
}

/// Title from the first user message: whitespace collapsed, truncated.
pub fn derive_title(text: &str, max_chars: usize) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate_title(&collapsed, max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use hacxorz_core::types::Confidence;
    use hacxorz_storage::SqliteChatStore;

    fn manager() -> (SessionManager, Arc<SqliteChatStore>) {
        let store = Arc::new(SqliteChatStore::in_memory().unwrap());
        let manager = SessionManager::new(
            Arc::clone(&store) as Arc<dyn ChatStore>,
            Arc::new(StaticIdentity::new("alice")),
            "New Chat",
            30,
        );
        (manager, store)
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("  hello   there \n", 30).as_deref(), Some("hello there"));
        assert_eq!(
            derive_title(&"x".repeat(40), 30),
            Some(format!("{}...", "x".repeat(30)))
        );
        assert!(derive_title("   ", 30).is_none());
    }

    #[tokio::test]
    async fn test_create_sets_active_and_empties_messages() {
        let (manager, _) = manager();
        let first = manager.create_session().await.unwrap();
        manager.append_user("hello").unwrap();

        let second = manager.create_session().await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.title, "New Chat");
        let snap = manager.snapshot().unwrap();
        assert_eq!(snap.session_id, Some(second.id));
        assert!(snap.messages.is_empty());
    }

    #[tokio::test]
    async fn test_select_replaces_sequence() {
        let (manager, store) = manager();
        let a = manager.create_session().await.unwrap();
        store.save_message(&Message::user(a.id, "in a")).await.unwrap();
        manager.create_session().await.unwrap();
        manager.append_user("local in b").unwrap();

        match manager.select_session(&a.id).await.unwrap() {
            SelectOutcome::Loaded(session) => {
                assert_eq!(session.id, a.id);
                assert_eq!(session.message_count, 1);
            }
            SelectOutcome::Superseded => panic!("load should apply"),
        }
        let snap = manager.snapshot().unwrap();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].text, "in a");
    }

    #[tokio::test]
    async fn test_select_unknown_session_keeps_state() {
        let (manager, _) = manager();
        let a = manager.create_session().await.unwrap();
        manager.append_user("keep me").unwrap();

        let err = manager.select_session(&SessionId::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
        assert_eq!(manager.active_session().unwrap().unwrap().id, a.id);
        assert_eq!(manager.snapshot().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_select_other_owners_session_is_not_found() {
        let (manager, store) = manager();
        let foreign = store
            .create_session(&OwnerId::new("mallory"), "New Chat")
            .await
            .unwrap();
        assert!(matches!(
            manager.select_session(&foreign.id).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_active_creates_replacement() {
        let (manager, _) = manager();
        let a = manager.create_session().await.unwrap();
        manager.append_user("bye").unwrap();

        match manager.delete_session(&a.id).await.unwrap() {
            DeleteOutcome::Replaced(session) => {
                assert_ne!(session.id, a.id);
                assert_eq!(session.title, "New Chat");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(manager.snapshot().unwrap().messages.is_empty());
        let (_, tag) = manager.append_user("hello again").unwrap();
        assert_ne!(tag.session_id, a.id);
    }

    #[tokio::test]
    async fn test_delete_inactive_keeps_active() {
        let (manager, _) = manager();
        let a = manager.create_session().await.unwrap();
        let b = manager.create_session().await.unwrap();
        assert!(matches!(
            manager.delete_session(&a.id).await.unwrap(),
            DeleteOutcome::Removed
        ));
        assert_eq!(manager.active_session().unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_stale_reply_rejected_after_switch() {
        let (manager, _) = manager();
        manager.create_session().await.unwrap();
        let (_, tag) = manager.append_user("hello").unwrap();
        manager.create_session().await.unwrap();

        let reply = Message::assistant(tag.session_id, "late", Confidence::new(90.0));
        assert!(manager.deliver_reply(tag, reply).unwrap().is_none());
        assert!(manager.snapshot().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_is_current_follows_active_sequence() {
        let (manager, _) = manager();
        manager.create_session().await.unwrap();
        let (_, tag) = manager.append_user("hello").unwrap();
        assert!(manager.is_current(tag).unwrap());

        // Appends keep the generation.
        manager.append_user("again").unwrap();
        assert!(manager.is_current(tag).unwrap());

        manager.create_session().await.unwrap();
        assert!(!manager.is_current(tag).unwrap());
    }

    #[tokio::test]
    async fn test_reply_rejected_after_clear() {
        let (manager, _) = manager();
        manager.create_session().await.unwrap();
        let (_, tag) = manager.append_user("hello").unwrap();
        manager.clear_messages().await.unwrap();

        let reply = Message::assistant(tag.session_id, "late", Confidence::new(90.0));
        assert!(manager.deliver_reply(tag, reply).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_only_from_default() {
        let (manager, _) = manager();
        let session = manager.create_session().await.unwrap();

        let renamed = manager
            .rename_if_default(&session.id, "What's the weather like today in Lisbon?")
            .await
            .unwrap();
        assert_eq!(renamed.as_deref(), Some("What's the weather like today ..."));

        let again = manager
            .rename_if_default(&session.id, "something else")
            .await
            .unwrap();
        assert!(again.is_none());

        let listed = manager.list_sessions().await.unwrap();
        assert_eq!(listed[0].title, "What's the weather like today ...");
    }

    #[tokio::test]
    async fn test_list_sessions_fills_counts() {
        let (manager, store) = manager();
        let a = manager.create_session().await.unwrap();
        store.save_message(&Message::user(a.id, "one")).await.unwrap();
        store.save_message(&Message::user(a.id, "two")).await.unwrap();
        manager.create_session().await.unwrap();

        let listed = manager.list_sessions().await.unwrap();
        assert_eq!(listed.len(), 2);
        let a_listed = listed.iter().find(|s| s.id == a.id).unwrap();
        assert_eq!(a_listed.message_count, 2);
    }

    #[tokio::test]
    async fn test_anonymous_identity_blocks_session_ops() {
        let store = Arc::new(SqliteChatStore::in_memory().unwrap());
        let manager = SessionManager::new(
            store as Arc<dyn ChatStore>,
            Arc::new(StaticIdentity::anonymous()),
            "New Chat",
            30,
        );
        assert!(matches!(
            manager.create_session().await,
            Err(ChatError::Unauthenticated)
        ));
        assert!(matches!(
            manager.append_user("hi"),
            Err(ChatError::InvalidState(_))
        ));
    }
}
