//! Chat client: the command facade the presentation layer talks to.
//!
//! Wires the session manager, reply orchestrator, pagination window,
//! debounced filter, and nudge scheduler together. Every local change is
//! followed by a `ChatEvent` on the broadcast channel.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use hacxorz_core::config::HacxorzConfig;
use hacxorz_core::events::ChatEvent;
use hacxorz_core::types::{Message, Nudge, Session, SessionId};
use hacxorz_inference::ReplyEngine;
use hacxorz_storage::ChatStore;

use crate::error::ChatError;
use crate::filter::{evaluate, DebouncedFilter, FilterTicket};
use crate::identity::IdentityProvider;
use crate::nudge::NudgeScheduler;
use crate::pagination::PaginationWindow;
use crate::quick_action::QuickAction;
use crate::reply::{GeneratedReply, ReplyOrchestrator};
use crate::session::{DeleteOutcome, ReplyTag, SelectOutcome, SessionManager};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;

/// How a reply request ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyDelivery {
    Delivered(Message),
    /// The session was switched, cleared, or reloaded first.
    Discarded,
}

/// Handle to an in-flight reply.
pub struct PendingReply {
    pub user_message: Message,
    handle: JoinHandle<ReplyDelivery>,
}

impl PendingReply {
    pub async fn wait(self) -> ReplyDelivery {
        match self.handle.await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(error = %e, "Reply task ended abnormally");
                ReplyDelivery::Discarded
            }
        }
    }
}

/// Result of a quick action.
pub enum QuickActionOutcome {
    Sent(PendingReply),
    /// The front end should confirm, then call `clear_chat`.
    ConfirmClear,
}

struct ViewState {
    window: PaginationWindow,
    show_confidence: bool,
}

struct ClientInner {
    max_message_length: usize,
    nudges_on_start: bool,
    sessions: SessionManager,
    replies: ReplyOrchestrator,
    filter: DebouncedFilter,
    nudges: NudgeScheduler,
    view: Mutex<ViewState>,
    events: broadcast::Sender<ChatEvent>,
}

#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<ClientInner>,
}

impl ChatClient {
    pub fn new(
        config: &HacxorzConfig,
        store: Arc<dyn ChatStore>,
        engine: Arc<dyn ReplyEngine>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ChatError> {
        let window = PaginationWindow::new(config.chat.page_size)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = ClientInner {
            max_message_length: config.chat.max_message_length,
            nudges_on_start: config.nudges.enabled,
            sessions: SessionManager::new(
                store,
                identity,
                config.chat.default_title.clone(),
                config.chat.title_max_chars,
            ),
            replies: ReplyOrchestrator::new(engine),
            filter: DebouncedFilter::new(config.chat.search_quiet()),
            nudges: NudgeScheduler::new(config.nudges.clone(), events.clone()),
            view: Mutex::new(ViewState {
                window,
                show_confidence: config.chat.show_confidence,
            }),
            events,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Start the nudge rotation (if enabled) and open a fresh session.
    pub async fn start(&self) -> Result<Session, ChatError> {
        if self.inner.nudges_on_start {
            self.inner.nudges.start();
        }
        self.new_session().await
    }

    /// Stop background timers.
    pub fn shutdown(&self) {
        self.inner.nudges.stop();
        self.inner.filter.clear();
        info!("Chat client shut down");
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append `text` to the active session and request a reply.
    ///
    /// The user message is visible as soon as this returns. Its reply is
    /// queued behind any earlier reply for the same session.
    pub fn send_message(&self, text: &str) -> Result<PendingReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.inner.max_message_length {
            return Err(ChatError::MessageTooLong(self.inner.max_message_length));
        }

        let (user_message, tag) = self.inner.sessions.append_user(text)?;
        let mut ticket = self.inner.replies.enqueue(tag.session_id);
        self.inner.publish_messages();
        self.inner.emit(ChatEvent::ReplyPending {
            session_id: tag.session_id,
        });
        debug!(session_id = %tag.session_id, "Message sent");

        let inner = Arc::clone(&self.inner);
        let prompt = user_message.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = inner.sessions.save_message(&prompt).await {
                warn!(session_id = %tag.session_id, error = %e, "Failed to save message");
                inner.emit(ChatEvent::notice_error("Error", "Failed to save message"));
            }

            ticket.wait_turn().await;
            if !inner.still_current(tag) {
                return inner.discard(tag);
            }
            let reply = inner.replies.generate(&tag.session_id, &prompt.text).await;
            inner.deliver(tag, &prompt.text, reply).await
        });

        Ok(PendingReply {
            user_message,
            handle,
        })
    }

    /// Delete the active session's messages, here and in the store.
    pub async fn clear_chat(&self) -> Result<u64, ChatError> {
        match self.inner.sessions.clear_messages().await {
            Ok(removed) => {
                self.inner.publish_messages();
                self.inner.emit(ChatEvent::notice_info(
                    "Chat cleared",
                    "All messages have been deleted from this session.",
                ));
                Ok(removed)
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear chat");
                self.inner
                    .emit(ChatEvent::notice_error("Error", "Failed to clear chat"));
                Err(e)
            }
        }
    }

    pub fn quick_action(&self, action: QuickAction) -> Result<QuickActionOutcome, ChatError> {
        match action.prompt() {
            Some(prompt) => Ok(QuickActionOutcome::Sent(self.send_message(prompt)?)),
            None => Ok(QuickActionOutcome::ConfirmClear),
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn new_session(&self) -> Result<Session, ChatError> {
        match self.inner.sessions.create_session().await {
            Ok(session) => {
                self.inner.emit(ChatEvent::ActiveSessionChanged {
                    session: Some(session.clone()),
                });
                self.inner.publish_messages();
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create session");
                self.inner.emit(ChatEvent::notice_error(
                    "Error",
                    "Failed to create new chat session",
                ));
                Err(e)
            }
        }
    }

    /// Switch to `id`. Returns `None` if a newer switch overtook this one.
    pub async fn select_session(&self, id: &SessionId) -> Result<Option<Session>, ChatError> {
        match self.inner.sessions.select_session(id).await {
            Ok(SelectOutcome::Loaded(session)) => {
                self.inner.emit(ChatEvent::ActiveSessionChanged {
                    session: Some(session.clone()),
                });
                self.inner.publish_messages();
                self.inner.emit(ChatEvent::HistoryPanelClosed);
                Ok(Some(session))
            }
            Ok(SelectOutcome::Superseded) => Ok(None),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Failed to load session");
                self.inner.emit(ChatEvent::notice_error(
                    "Error",
                    "Failed to load chat history",
                ));
                Err(e)
            }
        }
    }

    pub async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        let outcome = match self.inner.sessions.delete_session(id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Failed to delete session");
                self.inner
                    .emit(ChatEvent::notice_error("Error", "Failed to delete session"));
                return Err(e);
            }
        };

        self.inner.replies.forget(id);
        self.inner
            .emit(ChatEvent::SessionDeleted { session_id: *id });
        self.inner.emit(ChatEvent::notice_info(
            "Session deleted",
            "Chat session has been removed",
        ));

        match outcome {
            DeleteOutcome::Removed => Ok(()),
            DeleteOutcome::Replaced(session) => {
                self.inner.emit(ChatEvent::ActiveSessionChanged {
                    session: Some(session),
                });
                self.inner.publish_messages();
                Ok(())
            }
            DeleteOutcome::Orphaned(e) => {
                self.inner
                    .emit(ChatEvent::ActiveSessionChanged { session: None });
                self.inner.publish_messages();
                self.inner.emit(ChatEvent::notice_error(
                    "Error",
                    "Failed to create new chat session",
                ));
                Err(e)
            }
        }
    }

    /// The owner's sessions with message counts, most recent first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, ChatError> {
        self.inner.sessions.list_sessions().await.inspect_err(|e| {
            warn!(error = %e, "Failed to list sessions");
            self.inner.emit(ChatEvent::notice_error(
                "Error",
                "Failed to load chat history",
            ));
        })
    }

    // =========================================================================
    // Search and pagination
    // =========================================================================

    /// Debounced search. A blank query clears the filter at once.
    pub fn set_search_query(&self, text: &str) {
        let weak = Arc::downgrade(&self.inner);
        let scheduled = self.inner.filter.set_query(text, move |ticket| {
            if let Some(inner) = weak.upgrade() {
                inner.settle_search(ticket);
            }
        });
        if !scheduled {
            self.inner.emit(ChatEvent::SearchCleared);
        }
    }

    pub fn clear_search(&self) {
        self.inner.filter.clear();
        self.inner.emit(ChatEvent::SearchCleared);
    }

    pub fn active_search(&self) -> Option<String> {
        self.inner.filter.active_query()
    }

    /// Matches of the active query against the current messages.
    pub fn search_results(&self) -> Result<Option<Vec<Message>>, ChatError> {
        let Some(query) = self.inner.filter.active_query() else {
            return Ok(None);
        };
        let snapshot = self.inner.sessions.snapshot()?;
        Ok(Some(evaluate(&snapshot.messages, &query)))
    }

    /// Reveal one more page. Returns false if everything was already shown.
    pub fn load_more(&self) -> Result<bool, ChatError> {
        let snapshot = self.inner.sessions.snapshot()?;
        let total = snapshot.messages.len();
        let mut view = self.inner.view()?;
        view.window.observe(snapshot.generation);
        if !view.window.load_more(total) {
            return Ok(false);
        }
        let event = ChatEvent::VisibleSliceChanged {
            displayed: view.window.displayed(total),
            total,
            can_load_more: view.window.can_load_more(total),
        };
        drop(view);
        self.inner.emit(event);
        Ok(true)
    }

    /// The rendered prefix of the message sequence.
    pub fn visible_messages(&self) -> Result<Vec<Message>, ChatError> {
        let snapshot = self.inner.sessions.snapshot()?;
        let mut view = self.inner.view()?;
        view.window.observe(snapshot.generation);
        Ok(view.window.visible_slice(&snapshot.messages).to_vec())
    }

    pub fn can_load_more(&self) -> Result<bool, ChatError> {
        let snapshot = self.inner.sessions.snapshot()?;
        let mut view = self.inner.view()?;
        view.window.observe(snapshot.generation);
        Ok(view.window.can_load_more(snapshot.messages.len()))
    }

    pub fn total_pages(&self) -> Result<usize, ChatError> {
        let len = self.inner.sessions.snapshot()?.messages.len();
        Ok(self.inner.view()?.window.total_pages(len))
    }

    // =========================================================================
    // Presentation toggles
    // =========================================================================

    pub fn toggle_nudges(&self, enabled: bool) {
        self.inner.nudges.set_enabled(enabled);
    }

    pub fn nudges_enabled(&self) -> bool {
        self.inner.nudges.is_running()
    }

    pub fn toggle_confidence_display(&self, visible: bool) -> Result<(), ChatError> {
        self.inner.view()?.show_confidence = visible;
        self.inner
            .emit(ChatEvent::ConfidenceDisplayToggled { visible });
        Ok(())
    }

    pub fn show_confidence(&self) -> Result<bool, ChatError> {
        Ok(self.inner.view()?.show_confidence)
    }

    pub fn dismiss_nudge(&self) -> bool {
        self.inner.nudges.dismiss()
    }

    pub fn current_nudge(&self) -> Option<Nudge> {
        self.inner.nudges.current()
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn active_session(&self) -> Result<Option<Session>, ChatError> {
        self.inner.sessions.active_session()
    }

    /// The full message sequence of the active session.
    pub fn messages(&self) -> Result<Vec<Message>, ChatError> {
        Ok(self.inner.sessions.snapshot()?.messages)
    }
}

impl ClientInner {
    fn view(&self) -> Result<MutexGuard<'_, ViewState>, ChatError> {
        self.view
            .lock()
            .map_err(|e| ChatError::InvalidState(format!("view lock poisoned: {}", e)))
    }

    fn emit(&self, event: ChatEvent) {
        trace!(event = event.event_name(), "Publishing event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn still_current(&self, tag: ReplyTag) -> bool {
        self.sessions.is_current(tag).unwrap_or(false)
    }

    /// Announce a changed sequence and recompute every derived view.
    fn publish_messages(&self) {
        let snapshot = match self.sessions.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to read messages");
                return;
            }
        };
        let total = snapshot.messages.len();
        self.emit(ChatEvent::MessagesChanged {
            session_id: snapshot.session_id,
            generation: snapshot.generation,
            count: total,
        });

        let slice = self.view().map(|mut view| {
            view.window.observe(snapshot.generation);
            ChatEvent::VisibleSliceChanged {
                displayed: view.window.displayed(total),
                total,
                can_load_more: view.window.can_load_more(total),
            }
        });
        match slice {
            Ok(event) => self.emit(event),
            Err(e) => warn!(error = %e, "Failed to update pagination"),
        }

        if let Some(query) = self.filter.active_query() {
            let matches = evaluate(&snapshot.messages, &query);
            self.emit(ChatEvent::SearchResults {
                query,
                matches,
                searched: total,
            });
        }
    }

    fn settle_search(&self, ticket: FilterTicket) {
        if !self.filter.settle(&ticket) {
            debug!(query = %ticket.query, "Dropping superseded search");
            return;
        }
        let messages = match self.sessions.snapshot() {
            Ok(snapshot) => snapshot.messages,
            Err(e) => {
                warn!(error = %e, "Failed to read messages for search");
                return;
            }
        };
        let matches = evaluate(&messages, &ticket.query);
        let count = matches.len();
        let event = ChatEvent::SearchResults {
            query: ticket.query.clone(),
            matches,
            searched: messages.len(),
        };
        if self.filter.deliver_if_current(&ticket, || self.emit(event)) {
            debug!(query = %ticket.query, matches = count, "Search settled");
        } else {
            debug!(query = %ticket.query, "Dropping search superseded during evaluation");
        }
    }

    fn discard(&self, tag: ReplyTag) -> ReplyDelivery {
        debug!(session_id = %tag.session_id, "Discarding stale reply");
        self.emit(ChatEvent::ReplyDiscarded {
            session_id: tag.session_id,
        });
        ReplyDelivery::Discarded
    }

    /// Apply a reply if its sequence is still current, then persist it,
    /// raise the confidence warning, and retitle a default-named session.
    async fn deliver(&self, tag: ReplyTag, prompt: &str, reply: GeneratedReply) -> ReplyDelivery {
        let GeneratedReply {
            text,
            confidence,
            degraded,
        } = reply;
        let message = Message::assistant(tag.session_id, text, confidence);

        let delivered = match self.sessions.deliver_reply(tag, message) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(error = %e, "Failed to apply reply");
                None
            }
        };
        let Some(message) = delivered else {
            return self.discard(tag);
        };

        self.publish_messages();
        self.emit(ChatEvent::ReplyDelivered {
            message: message.clone(),
            degraded,
        });
        self.nudges.observe_reply(confidence);

        if let Err(e) = self.sessions.save_message(&message).await {
            warn!(session_id = %tag.session_id, error = %e, "Failed to save reply");
            self.emit(ChatEvent::notice_error("Error", "Failed to save reply"));
        }

        match self.sessions.rename_if_default(&tag.session_id, prompt).await {
            Ok(Some(title)) => self.emit(ChatEvent::SessionRenamed {
                session_id: tag.session_id,
                title,
            }),
            Ok(None) => {}
            Err(e) => warn!(session_id = %tag.session_id, error = %e, "Failed to rename session"),
        }

        ReplyDelivery::Delivered(message)
    }
}
