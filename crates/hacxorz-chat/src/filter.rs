//! Debounced substring search over the message sequence.
//!
//! Each `set_query` bumps a sequence number and schedules a settle callback
//! after the quiet interval. The callback must check its ticket against the
//! current sequence number at delivery time, so a query superseded after
//! its timer fired is still dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use hacxorz_core::types::Message;

/// A query that survived the quiet interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterTicket {
    pub seq: u64,
    pub query: String,
}

#[derive(Default)]
struct FilterState {
    seq: u64,
    pending: Option<JoinHandle<()>>,
    /// Last settled query; re-applied whenever the messages change.
    active: Option<String>,
}

pub struct DebouncedFilter {
    quiet: Duration,
    state: Arc<Mutex<FilterState>>,
}

impl DebouncedFilter {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: Arc::new(Mutex::new(FilterState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FilterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `text` as the latest query and schedule `on_settled` once no
    /// newer query arrives within the quiet interval.
    ///
    /// A blank query clears the filter immediately and returns false.
    pub fn set_query<F>(&self, text: &str, on_settled: F) -> bool
    where
        F: FnOnce(FilterTicket) + Send + 'static,
    {
        if text.trim().is_empty() {
            self.clear();
            return false;
        }

        let mut state = self.lock();
        state.seq += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        let ticket = FilterTicket {
            seq: state.seq,
            query: text.to_string(),
        };
        let quiet = self.quiet;
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            on_settled(ticket);
        }));
        true
    }

    /// Accept a settled ticket if it is still the latest query.
    pub fn settle(&self, ticket: &FilterTicket) -> bool {
        let mut state = self.lock();
        if ticket.seq != state.seq {
            return false;
        }
        state.pending = None;
        state.active = Some(ticket.query.clone());
        true
    }

    /// Run `deliver` only if `ticket` is still the latest query. The check
    /// and the delivery happen under one lock, so a `set_query` or `clear`
    /// cannot slip in between.
    pub fn deliver_if_current<F>(&self, ticket: &FilterTicket, deliver: F) -> bool
    where
        F: FnOnce(),
    {
        let state = self.lock();
        if ticket.seq != state.seq {
            return false;
        }
        deliver();
        true
    }

    /// Cancel any pending evaluation and drop the active query.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.seq += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.active = None;
    }

    pub fn active_query(&self) -> Option<String> {
        self.lock().active.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }
}

impl Drop for DebouncedFilter {
    fn drop(&mut self) {
        if let Some(pending) = self.lock().pending.take() {
            pending.abort();
        }
    }
}

/// Messages whose text contains `query`, ignoring case, in original order.
pub fn evaluate(messages: &[Message], query: &str) -> Vec<Message> {
    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| m.text.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hacxorz_core::types::SessionId;
    use tokio::sync::mpsc;

    fn messages(texts: &[&str]) -> Vec<Message> {
        let sid = SessionId::new();
        texts.iter().map(|t| Message::user(sid, *t)).collect()
    }

    #[test]
    fn test_evaluate_case_insensitive_preserves_order() {
        let seq = messages(&["Hello world", "nothing", "say HELLO", "hell"]);
        let found = evaluate(&seq, "hello");
        let texts: Vec<&str> = found.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello world", "say HELLO"]);
    }

    #[test]
    fn test_evaluate_no_match() {
        let seq = messages(&["alpha", "beta"]);
        assert!(evaluate(&seq, "gamma").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_queries_deliver_only_the_last() {
        let filter = Arc::new(DebouncedFilter::new(Duration::from_millis(300)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for query in ["a", "ab", "abc"] {
            let tx = tx.clone();
            let f = Arc::clone(&filter);
            filter.set_query(query, move |ticket| {
                if f.settle(&ticket) {
                    let _ = tx.send(ticket.query);
                }
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        drop(tx);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.recv().await.as_deref(), Some("abc"));
        assert!(rx.recv().await.is_none());
        assert_eq!(filter.active_query().as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_delivered_before_quiet_interval() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        let (tx, mut rx) = mpsc::unbounded_channel();
        filter.set_query("abc", move |ticket| {
            let _ = tx.send(ticket);
        });

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_rejected_at_delivery() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        let stale = FilterTicket {
            seq: 1,
            query: "old".into(),
        };
        filter.set_query("old", |_| {});
        filter.set_query("new", |_| {});
        assert!(!filter.settle(&stale));
        assert!(filter.active_query().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_changed_after_settle_blocks_delivery() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        filter.set_query("old", |_| {});
        let ticket = FilterTicket {
            seq: 1,
            query: "old".into(),
        };
        assert!(filter.settle(&ticket));

        // A newer query arrives while the settled one is being evaluated.
        filter.set_query("new", |_| {});
        let mut delivered = false;
        assert!(!filter.deliver_if_current(&ticket, || delivered = true));
        assert!(!delivered);

        filter.clear();
        assert!(!filter.deliver_if_current(&ticket, || delivered = true));
        assert!(!delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_ticket_is_delivered() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        filter.set_query("abc", |_| {});
        let ticket = FilterTicket {
            seq: 1,
            query: "abc".into(),
        };
        assert!(filter.settle(&ticket));
        let mut delivered = false;
        assert!(filter.deliver_if_current(&ticket, || delivered = true));
        assert!(delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        let (tx, mut rx) = mpsc::unbounded_channel::<FilterTicket>();
        filter.set_query("abc", move |ticket| {
            let _ = tx.send(ticket);
        });
        assert!(filter.is_pending());
        filter.clear();
        assert!(!filter.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        // The aborted task dropped its sender without sending.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_query_clears() {
        let filter = DebouncedFilter::new(Duration::from_millis(300));
        assert!(!filter.set_query("   ", |_| {}));
        assert!(!filter.is_pending());
        assert!(filter.active_query().is_none());
    }
}
