//! HacXorZ Storage crate - SQLite persistence for chat sessions and messages.
//!
//! Provides a WAL-mode SQLite database with migrations, repositories for
//! sessions and messages, and the `ChatStore` trait the chat core talks to.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod store;

pub use db::Database;
pub use repository::{MessageRepository, SessionRepository};
pub use store::{ChatStore, SqliteChatStore};
