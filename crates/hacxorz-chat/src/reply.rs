//! Reply orchestrator: serialized, failure-absorbing reply generation.
//!
//! Replies for one session run strictly one at a time in request order.
//! Each request takes a `LaneTicket`; the ticket waits for its predecessor
//! and releases its successor when dropped, so a panicking or aborted job
//! never wedges the lane. A lane is removed when its last ticket drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use hacxorz_core::types::{Confidence, SessionId};
use hacxorz_inference::{InferenceError, ReplyEngine};

/// Shown when the engine fails or answers with garbage.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again.";
pub const FALLBACK_CONFIDENCE: f64 = 30.0;

/// A validated reply, always well-formed.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedReply {
    pub text: String,
    pub confidence: Confidence,
    /// True when this is the fallback rather than engine output.
    pub degraded: bool,
}

impl GeneratedReply {
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            confidence: Confidence::new(FALLBACK_CONFIDENCE),
            degraded: true,
        }
    }
}

type SharedLanes = Arc<Mutex<Lanes>>;

fn lock_lanes(lanes: &SharedLanes) -> MutexGuard<'_, Lanes> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tail of each session's queue, tagged with the serial of the ticket
/// that owns it.
#[derive(Default)]
struct Lanes {
    next_serial: u64,
    tails: HashMap<SessionId, (u64, oneshot::Receiver<()>)>,
}

/// Place in a session's reply queue.
pub struct LaneTicket {
    prev: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
    lanes: SharedLanes,
    session_id: SessionId,
    serial: u64,
}

impl LaneTicket {
    /// Wait until every earlier request for the same session has finished.
    pub async fn wait_turn(&mut self) {
        if let Some(prev) = self.prev.take() {
            // Err means the predecessor was dropped, which also ends its turn.
            let _ = prev.await;
        }
    }
}

impl Drop for LaneTicket {
    fn drop(&mut self) {
        let mut lanes = lock_lanes(&self.lanes);
        if lanes
            .tails
            .get(&self.session_id)
            .is_some_and(|(serial, _)| *serial == self.serial)
        {
            lanes.tails.remove(&self.session_id);
        }
    }
}

pub struct ReplyOrchestrator {
    engine: Arc<dyn ReplyEngine>,
    lanes: SharedLanes,
}

impl ReplyOrchestrator {
    pub fn new(engine: Arc<dyn ReplyEngine>) -> Self {
        Self {
            engine,
            lanes: SharedLanes::default(),
        }
    }

    /// Take the next place in `session_id`'s queue. Must be called in
    /// request order; the returned ticket can then be awaited anywhere.
    pub fn enqueue(&self, session_id: SessionId) -> LaneTicket {
        let (done, tail) = oneshot::channel();
        let mut lanes = lock_lanes(&self.lanes);
        lanes.next_serial += 1;
        let serial = lanes.next_serial;
        let prev = lanes
            .tails
            .insert(session_id, (serial, tail))
            .map(|(_, rx)| rx);
        drop(lanes);
        LaneTicket {
            prev,
            _done: done,
            lanes: Arc::clone(&self.lanes),
            session_id,
            serial,
        }
    }

    /// Drop the queue of a deleted session.
    pub fn forget(&self, session_id: &SessionId) {
        lock_lanes(&self.lanes).tails.remove(session_id);
    }

    /// Sessions with a reply queued or in flight.
    pub fn active_lanes(&self) -> usize {
        lock_lanes(&self.lanes).tails.len()
    }

    /// Ask the engine for a reply, absorbing every failure into the fallback.
    pub async fn generate(&self, session_id: &SessionId, text: &str) -> GeneratedReply {
        let result = self
            .engine
            .score_and_respond(session_id, text)
            .await
            .and_then(|raw| {
                let confidence = Confidence::try_new(raw.confidence).ok_or_else(|| {
                    InferenceError::Malformed(format!("confidence out of range: {}", raw.confidence))
                })?;
                if raw.text.trim().is_empty() {
                    return Err(InferenceError::Malformed("empty reply text".into()));
                }
                Ok(GeneratedReply {
                    text: raw.text,
                    confidence,
                    degraded: false,
                })
            });

        match result {
            Ok(reply) => {
                debug!(
                    session_id = %session_id,
                    engine = self.engine.name(),
                    confidence = reply.confidence.value(),
                    "Reply generated"
                );
                reply
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    engine = self.engine.name(),
                    error = %e,
                    "Reply generation failed, using fallback"
                );
                GeneratedReply::fallback()
            }
        }
    }
}
