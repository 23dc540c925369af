//! Shared domain types, configuration, errors, and change notifications for
//! the HacXorZ chat client.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::HacxorzConfig;
pub use error::{HacxorzError, Result};
pub use events::{ChatEvent, NoticeLevel};
pub use types::*;
