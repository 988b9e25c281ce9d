//! Outward status signal
//!
//! Every orchestrator cycle reports its final outcome through a
//! [`StatusSink`], whatever branch it took. The daemon installs a
//! broadcast-backed sink so the presentation side can consume outcomes
//! without the orchestrator knowing about it.

use crate::session::{Action, AttemptOutcome};
use tokio::sync::broadcast;

/// Consumer of orchestrator outcomes
pub trait StatusSink: Send + Sync {
    fn report(&self, action: Action, outcome: &AttemptOutcome);
}

/// Sink that only logs the outcome
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, action: Action, outcome: &AttemptOutcome) {
        tracing::info!(
            %action,
            success = outcome.success,
            elsewhere = outcome.logged_in_elsewhere,
            "cycle finished"
        );
    }
}

/// Status notification carried to the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct StatusEvent {
    pub action: Action,
    pub success: bool,
    pub logged_in_elsewhere: bool,
}

/// Broadcast-backed sink; subscribers that lag simply miss events
pub struct BroadcastSink {
    tx: broadcast::Sender<StatusEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }
}

impl StatusSink for BroadcastSink {
    fn report(&self, action: Action, outcome: &AttemptOutcome) {
        // no subscribers is fine
        let _ = self.tx.send(StatusEvent {
            action,
            success: outcome.success,
            logged_in_elsewhere: outcome.logged_in_elsewhere,
        });
    }
}
