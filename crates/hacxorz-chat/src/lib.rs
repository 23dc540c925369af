//! Chat state core for HacXorZ.
//!
//! Session lifecycle, the in-memory message log with optimistic appends,
//! serialized reply generation with a degraded fallback, pagination,
//! debounced search, and the nudge scheduler. `ChatClient` ties them
//! together behind the command surface a front end uses.

pub mod client;
pub mod confidence;
pub mod error;
pub mod filter;
pub mod history;
pub mod identity;
pub mod nudge;
pub mod pagination;
pub mod quick_action;
pub mod reply;
pub mod session;
pub mod store;

pub use client::{ChatClient, PendingReply, QuickActionOutcome, ReplyDelivery};
pub use confidence::{bar_width, classify, warning_text, ConfidenceLevel, LOW_CONFIDENCE_ADVICE};
pub use error::ChatError;
pub use filter::{evaluate, DebouncedFilter, FilterTicket};
pub use history::{date_label, truncate_title, HistoryEntry};
pub use identity::{IdentityProvider, StaticIdentity};
pub use nudge::NudgeScheduler;
pub use pagination::PaginationWindow;
pub use quick_action::QuickAction;
pub use reply::{GeneratedReply, ReplyOrchestrator, FALLBACK_CONFIDENCE, FALLBACK_REPLY};
pub use session::{derive_title, DeleteOutcome, ReplyTag, SelectOutcome, SessionManager};
pub use store::MessageStore;
