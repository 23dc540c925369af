//! Remote sentiment classifier engine.
//!
//! Sends the user message to a text-classification endpoint (DistilBERT
//! SST-2 by default), then builds a reply from the winning label. The score
//! becomes the confidence.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use hacxorz_core::config::InferenceConfig;
use hacxorz_core::types::SessionId;

use crate::engine::{ReplyEngine, ScoredReply};
use crate::error::InferenceError;

const POSITIVE_REPLY: &str = "I can sense the positive sentiment in your message! That's great to hear. Your message seems optimistic and upbeat. How can I help you further with this positive energy?";
const NEGATIVE_REPLY: &str = "I notice your message has a negative sentiment. I'm here to help and support you. Would you like to talk more about what's concerning you or how I can assist?";
const NEUTRAL_REPLY: &str =
    "I've analyzed the sentiment of your message. Let me know how I can best assist you with your request.";
const VERIFY_ADVICE: &str = "Remember to verify information from multiple reliable sources and think critically about what you read online.";

/// Words that mark a message as touching on misinformation.
const SENSITIVE_TERMS: [&str; 2] = ["fake", "misinformation"];
/// Confidence penalty for sensitive topics, and the floor it cannot go below.
const SENSITIVE_PENALTY: f64 = 15.0;
const SENSITIVE_FLOOR: f64 = 45.0;

/// One classifier label with its probability in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SentimentLabel {
    pub label: String,
    pub score: f64,
}

/// Classifier payloads come either flat (`[{..}, {..}]`) or nested per input
/// (`[[{..}, {..}]]`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Nested(Vec<Vec<SentimentLabel>>),
    Flat(Vec<SentimentLabel>),
}

/// Pick the highest-scoring label out of a classifier response body.
pub fn top_label(body: &str) -> Result<SentimentLabel, InferenceError> {
    let parsed: ClassifierResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Malformed(e.to_string()))?;
    let labels = match parsed {
        ClassifierResponse::Nested(outer) => outer.into_iter().flatten().collect::<Vec<_>>(),
        ClassifierResponse::Flat(labels) => labels,
    };
    labels
        .into_iter()
        .filter(|l| l.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| InferenceError::Malformed("no labels in response".into()))
}

/// Build the reply for `message` from the winning classifier label.
pub fn compose_reply(label: &SentimentLabel, message: &str) -> ScoredReply {
    let mut text = match label.label.as_str() {
        "POSITIVE" => POSITIVE_REPLY,
        "NEGATIVE" => NEGATIVE_REPLY,
        _ => NEUTRAL_REPLY,
    }
    .to_string();

    let mut confidence = (label.score * 100.0).round();
    text.push_str(&format!(
        "\n\n*Sentiment Analysis: {} ({}% confidence)*",
        label.label.to_lowercase(),
        confidence
    ));

    if mentions_sensitive_topic(message) {
        text.push_str("\n\n");
        text.push_str(VERIFY_ADVICE);
        confidence = (confidence - SENSITIVE_PENALTY).max(SENSITIVE_FLOOR);
    }

    ScoredReply { text, confidence }
}

fn mentions_sensitive_topic(message: &str) -> bool {
    let lower = message.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| lower.contains(term))
}

/// HTTP client for a hosted text-classification model.
pub struct SentimentEngine {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl SentimentEngine {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    /// Build from config, reading the bearer token from `config.token_env`.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            warn!(
                env = %config.token_env,
                "No inference token set, requests will be anonymous"
            );
        }
        Self::new(config.endpoint.clone(), token, config.timeout())
    }
}

#[async_trait]
impl ReplyEngine for SentimentEngine {
    fn name(&self) -> &'static str {
        "sentiment"
    }

    async fn score_and_respond(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<ScoredReply, InferenceError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({
                "inputs": text,
                "options": { "wait_for_model": true },
            }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                session_id = %session_id,
                status = status.as_u16(),
                body = %body,
                "Classifier returned an error status"
            );
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let label = top_label(&body)?;
        debug!(
            session_id = %session_id,
            label = %label.label,
            score = label.score,
            "Classified message"
        );
        Ok(compose_reply(&label, text))
    }
}
