use serde::{Deserialize, Serialize};

use crate::types::{Message, Nudge, Session, SessionId};

/// Severity of a user-visible notice (toast).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Change notifications published by the chat core to the presentation layer.
///
/// Every local mutation is followed by the matching event so a front end can
/// re-read whatever view it renders. Events carry just enough data for the
/// common cases; full views are available from the client on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ChatEvent {
    // =========================================================================
    // Sessions
    // =========================================================================
    /// The active session changed (created, selected, or lost).
    ActiveSessionChanged { session: Option<Session> },

    /// A session's title changed after its first exchange.
    SessionRenamed { session_id: SessionId, title: String },

    /// A session was removed from the store.
    SessionDeleted { session_id: SessionId },

    /// Transient history panel should close (after a selection).
    HistoryPanelClosed,

    // =========================================================================
    // Messages
    // =========================================================================
    /// The message sequence was mutated.
    MessagesChanged {
        session_id: Option<SessionId>,
        generation: u64,
        count: usize,
    },

    /// The rendered pagination prefix changed.
    VisibleSliceChanged {
        displayed: usize,
        total: usize,
        can_load_more: bool,
    },

    /// A reply is being generated for the session.
    ReplyPending { session_id: SessionId },

    /// A reply landed in the active session.
    ReplyDelivered { message: Message, degraded: bool },

    /// A reply finished after its session stopped being current and was dropped.
    ReplyDiscarded { session_id: SessionId },

    // =========================================================================
    // Search
    // =========================================================================
    /// Filtered subsequence for the latest settled query.
    SearchResults {
        query: String,
        matches: Vec<Message>,
        searched: usize,
    },

    /// Show the unfiltered sequence again.
    SearchCleared,

    // =========================================================================
    // Presentation
    // =========================================================================
    /// The visible nudge slot changed. `None` means nothing is shown.
    NudgeChanged { nudge: Option<Nudge> },

    /// Periodic nudges were switched on or off.
    NudgesToggled { enabled: bool },

    /// Confidence scores should be shown or hidden.
    ConfidenceDisplayToggled { visible: bool },

    /// Recoverable, user-visible notice.
    Notice {
        level: NoticeLevel,
        title: String,
        description: String,
    },
}

impl ChatEvent {
    pub fn notice_info(title: impl Into<String>, description: impl Into<String>) -> Self {
        ChatEvent::Notice {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn notice_error(title: impl Into<String>, description: impl Into<String>) -> Self {
        ChatEvent::Notice {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::ActiveSessionChanged { .. } => "active_session_changed",
            ChatEvent::SessionRenamed { .. } => "session_renamed",
            ChatEvent::SessionDeleted { .. } => "session_deleted",
            ChatEvent::HistoryPanelClosed => "history_panel_closed",
            ChatEvent::MessagesChanged { .. } => "messages_changed",
            ChatEvent::VisibleSliceChanged { .. } => "visible_slice_changed",
            ChatEvent::ReplyPending { .. } => "reply_pending",
            ChatEvent::ReplyDelivered { .. } => "reply_delivered",
            ChatEvent::ReplyDiscarded { .. } => "reply_discarded",
            ChatEvent::SearchResults { .. } => "search_results",
            ChatEvent::SearchCleared => "search_cleared",
            ChatEvent::NudgeChanged { .. } => "nudge_changed",
            ChatEvent::NudgesToggled { .. } => "nudges_toggled",
            ChatEvent::ConfidenceDisplayToggled { .. } => "confidence_display_toggled",
            ChatEvent::Notice { .. } => "notice",
        }
    }
}
