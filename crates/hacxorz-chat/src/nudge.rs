//! Nudge scheduler: periodic advisory tips plus low-confidence warnings,
//! both writing to a single visible slot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use hacxorz_core::config::NudgeConfig;
use hacxorz_core::events::ChatEvent;
use hacxorz_core::types::{Confidence, Nudge, NudgeKind};

use crate::confidence::warning_text;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct SlotState {
    current: Option<Nudge>,
    /// Bumped on every write; an expiry only clears the nudge it was armed for.
    serial: u64,
    expiry: Option<JoinHandle<()>>,
}

/// The single visible nudge.
struct NudgeSlot {
    state: Mutex<SlotState>,
    events: broadcast::Sender<ChatEvent>,
}

impl NudgeSlot {
    fn show(self: &Arc<Self>, text: String, kind: NudgeKind, duration: Duration) -> Nudge {
        let nudge = Nudge {
            text,
            kind,
            expires_at: chrono::Duration::from_std(duration)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut state = lock(&self.state);
        state.serial += 1;
        let serial = state.serial;
        if let Some(prev) = state.expiry.take() {
            prev.abort();
        }
        state.current = Some(nudge.clone());

        let slot = Arc::clone(self);
        state.expiry = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            slot.expire(serial);
        }));
        drop(state);

        let _ = self.events.send(ChatEvent::NudgeChanged {
            nudge: Some(nudge.clone()),
        });
        nudge
    }

    fn expire(&self, serial: u64) {
        let mut state = lock(&self.state);
        if state.serial != serial {
            return;
        }
        state.expiry = None;
        if state.current.take().is_some() {
            drop(state);
            let _ = self.events.send(ChatEvent::NudgeChanged { nudge: None });
        }
    }

    fn clear(&self) -> bool {
        let mut state = lock(&self.state);
        state.serial += 1;
        if let Some(expiry) = state.expiry.take() {
            expiry.abort();
        }
        let had = state.current.take().is_some();
        drop(state);
        if had {
            let _ = self.events.send(ChatEvent::NudgeChanged { nudge: None });
        }
        had
    }

    fn current(&self) -> Option<Nudge> {
        lock(&self.state).current.clone()
    }
}

/// Owns the periodic rotation task and the visible slot.
///
/// The periodic task is started and stopped explicitly; restarting always
/// aborts the previous task first so at most one rotation runs.
pub struct NudgeScheduler {
    config: NudgeConfig,
    slot: Arc<NudgeSlot>,
    periodic: Mutex<Option<JoinHandle<()>>>,
}

impl NudgeScheduler {
    pub fn new(config: NudgeConfig, events: broadcast::Sender<ChatEvent>) -> Self {
        Self {
            config,
            slot: Arc::new(NudgeSlot {
                state: Mutex::new(SlotState::default()),
                events,
            }),
            periodic: Mutex::new(None),
        }
    }

    /// Start (or restart) the periodic rotation. First tip after one interval.
    pub fn start(&self) {
        let mut periodic = lock(&self.periodic);
        if let Some(prev) = periodic.take() {
            prev.abort();
        }
        if self.config.messages.is_empty() {
            debug!("No advisory messages configured, rotation not started");
            return;
        }

        let slot = Arc::clone(&self.slot);
        let messages = self.config.messages.clone();
        let interval = self.config.interval();
        let display = self.config.display();
        *periodic = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let text = pick(&messages);
                slot.show(text, NudgeKind::Advisory, display);
            }
        }));
        info!(interval_secs = interval.as_secs(), "Nudge rotation started");
    }

    /// Cancel the periodic rotation. A visible nudge runs out its own expiry.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.periodic).take() {
            handle.abort();
            info!("Nudge rotation stopped");
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
        let _ = self
            .slot
            .events
            .send(ChatEvent::NudgesToggled { enabled });
    }

    pub fn is_running(&self) -> bool {
        lock(&self.periodic).is_some()
    }

    /// Show an arbitrary nudge, replacing whatever is visible.
    pub fn show(&self, text: impl Into<String>, kind: NudgeKind, duration: Duration) -> Nudge {
        self.slot.show(text.into(), kind, duration)
    }

    /// Show the low-confidence warning for `confidence`.
    pub fn warn_low_confidence(&self, confidence: Confidence) -> Nudge {
        self.slot.show(
            warning_text(confidence),
            NudgeKind::ConfidenceWarning,
            self.config.warning(),
        )
    }

    /// Raise a warning if `confidence` is under the threshold. Independent
    /// of whether the rotation is running.
    ///
    /// Returns true if a warning was shown.
    pub fn observe_reply(&self, confidence: Confidence) -> bool {
        if !self.config.confidence_warnings
            || !confidence.is_below(self.config.low_confidence_threshold)
        {
            return false;
        }
        self.warn_low_confidence(confidence);
        true
    }

    /// Hide the visible nudge now. Returns false if nothing was shown.
    pub fn dismiss(&self) -> bool {
        self.slot.clear()
    }

    pub fn current(&self) -> Option<Nudge> {
        self.slot.current()
    }
}

impl Drop for NudgeScheduler {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.periodic).take() {
            handle.abort();
        }
        if let Some(expiry) = lock(&self.slot.state).expiry.take() {
            expiry.abort();
        }
    }
}

fn pick(messages: &[String]) -> String {
    let idx = rand::rng().random_range(0..messages.len());
    messages[idx].clone()
}
