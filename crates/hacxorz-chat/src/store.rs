//! In-memory ordered message log for the active session.
//!
//! `generation` identifies the sequence: it changes on `replace_all` and
//! `clear` but not on `append_optimistic`. Derived views and in-flight
//! replies compare against it to detect that the sequence they were built
//! for is gone.

use hacxorz_core::types::{Message, MessageId, SessionId};

#[derive(Debug, Default)]
pub struct MessageStore {
    session_id: Option<SessionId>,
    messages: Vec<Message>,
    generation: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence, sorted by `created_at` with ties kept in
    /// the given order. Returns the new generation.
    pub fn replace_all(&mut self, session_id: Option<SessionId>, mut messages: Vec<Message>) -> u64 {
        messages.sort_by_key(|m| m.created_at);
        self.session_id = session_id;
        self.messages = messages;
        self.generation += 1;
        self.generation
    }

    /// Append before remote confirmation. A timestamp older than the tail
    /// is raised to the tail's so the sequence stays ordered.
    pub fn append_optimistic(&mut self, mut message: Message) -> &Message {
        if let Some(last) = self.messages.last() {
            if message.created_at < last.created_at {
                message.created_at = last.created_at;
            }
        }
        self.messages.push(message);
        let idx = self.messages.len() - 1;
        &self.messages[idx]
    }

    /// Empty the sequence, keeping the session. Returns the new generation.
    pub fn clear(&mut self) -> u64 {
        self.messages.clear();
        self.generation += 1;
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hacxorz_core::types::Confidence;

    fn at(sid: SessionId, text: &str, offset_secs: i64) -> Message {
        let mut m = Message::user(sid, text);
        m.created_at = Utc::now() + Duration::seconds(offset_secs);
        m
    }

    fn is_sorted(messages: &[Message]) -> bool {
        messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at)
    }

    #[test]
    fn test_replace_all_sorts_stably() {
        let sid = SessionId::new();
        let base = Utc::now();
        let mut a = Message::user(sid, "a");
        let mut b = Message::user(sid, "b");
        let mut c = Message::user(sid, "c");
        a.created_at = base + Duration::seconds(5);
        b.created_at = base;
        c.created_at = base;

        let mut store = MessageStore::new();
        store.replace_all(Some(sid), vec![a, b, c]);
        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "a"]);
        assert_eq!(store.session_id(), Some(sid));
    }

    #[test]
    fn test_generation_changes_on_replace_and_clear_only() {
        let sid = SessionId::new();
        let mut store = MessageStore::new();
        let g1 = store.replace_all(Some(sid), vec![]);
        store.append_optimistic(Message::user(sid, "hello"));
        assert_eq!(store.generation(), g1);
        let g2 = store.clear();
        assert!(g2 > g1);
        assert!(store.is_empty());
        assert_eq!(store.session_id(), Some(sid));
    }

    #[test]
    fn test_appends_preserve_order() {
        let sid = SessionId::new();
        let mut store = MessageStore::new();
        store.replace_all(Some(sid), vec![at(sid, "late", 60)]);

        // Clock skew: older timestamp is pulled up to the tail.
        store.append_optimistic(at(sid, "early", 0));
        store.append_optimistic(at(sid, "later", 120));
        store.append_optimistic(Message::assistant(sid, "reply", Confidence::new(50.0)));

        assert_eq!(store.len(), 4);
        assert!(is_sorted(store.messages()));
        assert_eq!(store.messages()[1].text, "early");
    }

    #[test]
    fn test_replace_then_append_never_reintroduces_removed() {
        let sid = SessionId::new();
        let mut store = MessageStore::new();
        let old = Message::user(sid, "old");
        let old_id = old.id;
        store.replace_all(Some(sid), vec![old]);
        store.replace_all(Some(sid), vec![Message::user(sid, "fresh")]);

        for i in 0..5 {
            store.append_optimistic(Message::user(sid, format!("m{}", i)));
        }
        assert!(!store.contains(&old_id));
        assert_eq!(store.len(), 6);
    }
}
