//! Error types for the chat state core.

use hacxorz_core::error::HacxorzError;
use hacxorz_core::types::SessionId;
use hacxorz_inference::InferenceError;

/// Errors from the chat client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("inference failure: {0}")]
    InferenceFailure(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("page size must be greater than zero, got {0}")]
    InvalidPageSize(usize),
    #[error("no owner identity available")]
    Unauthenticated,
}

impl From<HacxorzError> for ChatError {
    fn from(err: HacxorzError) -> Self {
        ChatError::RemoteUnavailable(err.to_string())
    }
}

impl From<InferenceError> for ChatError {
    fn from(err: InferenceError) -> Self {
        ChatError::InferenceFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::InvalidPageSize(0).to_string(),
            "page size must be greater than zero, got 0"
        );
        assert_eq!(
            ChatError::InvalidState("no active session".into()).to_string(),
            "invalid state: no active session"
        );
        assert_eq!(
            ChatError::Unauthenticated.to_string(),
            "no owner identity available"
        );
    }

    #[test]
    fn test_session_not_found_preserves_id() {
        let id = SessionId(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap());
        assert_eq!(
            ChatError::SessionNotFound(id).to_string(),
            "session not found: 550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_storage_errors_become_remote_unavailable() {
        let err: ChatError = HacxorzError::Storage("connection lost".into()).into();
        assert!(matches!(err, ChatError::RemoteUnavailable(_)));
        assert!(err.to_string().contains("connection lost"));

        let err: ChatError = HacxorzError::Io(std::io::Error::other("disk gone")).into();
        assert!(matches!(err, ChatError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_inference_errors_become_inference_failure() {
        let err: ChatError = InferenceError::Timeout.into();
        assert!(matches!(err, ChatError::InferenceFailure(_)));
        assert_eq!(err.to_string(), "inference failure: Request timed out");
    }
}
