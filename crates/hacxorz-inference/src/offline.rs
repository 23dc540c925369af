//! Offline engine with canned replies.
//!
//! Used when no classifier is reachable. Picks a stock reply, a random
//! confidence, and waits a human-ish delay before answering.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use hacxorz_core::types::SessionId;

use crate::engine::{ReplyEngine, ScoredReply};
use crate::error::InferenceError;

const OPENERS: [&str; 4] = [
    "I understand your query. Based on my analysis, here's what I can tell you...",
    "That's an interesting question. Let me provide you with some insights...",
    "I've processed your request. Here's my response with ethical considerations in mind...",
    "Thank you for that question. I'll do my best to provide a helpful and responsible answer...",
];
const CLOSER: &str = "Remember, I aim to be helpful while maintaining ethical standards and transparency about my limitations.";

pub struct OfflineEngine {
    min_latency: Duration,
    max_latency: Duration,
}

impl OfflineEngine {
    /// Engine with a 1.5 to 2.5 second reply delay.
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(1500), Duration::from_millis(2500))
    }

    pub fn with_latency(min: Duration, max: Duration) -> Self {
        Self {
            min_latency: min.min(max),
            max_latency: max.max(min),
        }
    }
}

impl Default for OfflineEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyEngine for OfflineEngine {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn score_and_respond(
        &self,
        session_id: &SessionId,
        _text: &str,
    ) -> Result<ScoredReply, InferenceError> {
        // ThreadRng is not Send, so draw everything before the await.
        let (reply, delay) = {
            let mut rng = rand::rng();
            let opener = OPENERS[rng.random_range(0..OPENERS.len())];
            let confidence = rng.random_range(0.0..100.0);
            let min = self.min_latency.as_millis() as u64;
            let max = self.max_latency.as_millis() as u64;
            let delay = Duration::from_millis(rng.random_range(min..=max));
            (
                ScoredReply::new(format!("{} {}", opener, CLOSER), confidence),
                delay,
            )
        };

        tokio::time::sleep(delay).await;
        debug!(
            session_id = %session_id,
            confidence = reply.confidence,
            "Offline reply generated"
        );
        Ok(reply)
    }
}
