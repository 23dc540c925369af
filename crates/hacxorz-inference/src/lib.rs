//! HacXorZ Inference crate - reply generation backends.
//!
//! Defines the `ReplyEngine` trait the chat core uses to turn a user message
//! into a scored reply, plus two engines: a remote sentiment classifier and
//! an offline engine with canned replies.

pub mod engine;
pub mod error;
pub mod offline;
pub mod sentiment;

pub use engine::{from_config, ReplyEngine, ScoredReply};
pub use error::InferenceError;
pub use offline::OfflineEngine;
pub use sentiment::{compose_reply, SentimentEngine, SentimentLabel};
