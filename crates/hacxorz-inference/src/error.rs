use thiserror::Error;

/// Failures of a reply engine.
///
/// The chat core never surfaces these directly; any of them produces the
/// degraded fallback reply.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_decode() {
            InferenceError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            InferenceError::Status(status.as_u16())
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(InferenceError::Status(503).to_string(), "Unexpected status: 503");
        assert_eq!(InferenceError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            InferenceError::Malformed("empty body".into()).to_string(),
            "Malformed response: empty body"
        );
    }
}
