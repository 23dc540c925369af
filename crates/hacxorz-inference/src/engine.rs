//! The reply engine contract.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use hacxorz_core::config::InferenceConfig;
use hacxorz_core::error::HacxorzError;
use hacxorz_core::types::SessionId;

use crate::error::InferenceError;
use crate::offline::OfflineEngine;
use crate::sentiment::SentimentEngine;

/// Raw engine output.
///
/// `confidence` is unvalidated: callers must reject values outside
/// `[0, 100]` and empty text before showing the reply.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredReply {
    pub text: String,
    pub confidence: f64,
}

impl ScoredReply {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Turns a user message into a reply with a confidence score.
#[async_trait]
pub trait ReplyEngine: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    async fn score_and_respond(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<ScoredReply, InferenceError>;
}

/// Build the engine named by `config.provider`.
pub fn from_config(config: &InferenceConfig) -> Result<Arc<dyn ReplyEngine>, HacxorzError> {
    let engine: Arc<dyn ReplyEngine> = match config.provider.as_str() {
        "sentiment" => Arc::new(
            SentimentEngine::from_config(config)
                .map_err(|e| HacxorzError::Inference(e.to_string()))?,
        ),
        "offline" => Arc::new(OfflineEngine::new()),
        other => {
            return Err(HacxorzError::Config(format!(
                "unknown inference provider: {}",
                other
            )))
        }
    };
    info!(engine = engine.name(), "Reply engine ready");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_provider() {
        let mut config = InferenceConfig::default();
        config.provider = "offline".into();
        assert_eq!(from_config(&config).unwrap().name(), "offline");

        config.provider = "sentiment".into();
        assert_eq!(from_config(&config).unwrap().name(), "sentiment");
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let mut config = InferenceConfig::default();
        config.provider = "oracle".into();
        let err = from_config(&config).err().unwrap();
        assert!(matches!(err, HacxorzError::Config(_)));
    }
}
