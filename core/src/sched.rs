//! Renewal scheduling
//!
//! The orchestrator only issues intents: "fire this action once after D",
//! "fire it every I", "stop firing it". Each action kind owns a single
//! logical slot; arming a slot replaces whatever was armed there before,
//! so at most one repeating renewal exists per session.

use crate::session::Action;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait Scheduler: Send + Sync {
    /// Fire `action` once after `delay`
    fn schedule_once(&self, delay: Duration, action: Action);

    /// Fire `action` every `interval`, first fire one interval from now
    fn schedule_repeating(&self, interval: Duration, action: Action);

    /// Disarm whatever is armed for `action`
    fn cancel(&self, action: Action);
}

/// Timer-task scheduler delivering fired actions over an mpsc channel.
///
/// The daemon loop owns the receiving end and feeds each fired action back
/// into the orchestrator.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Action>,
    slots: Mutex<HashMap<Action, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                slots: Mutex::new(HashMap::new()),
            }),
            rx,
        )
    }

    fn arm(&self, action: Action, handle: JoinHandle<()>) {
        if let Some(previous) = self.slots.lock().insert(action, handle) {
            previous.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, action: Action) {
        tracing::debug!(%action, ?delay, "arming one-shot");
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(action);
        });
        self.arm(action, handle);
    }

    fn schedule_repeating(&self, interval: Duration, action: Action) {
        tracing::debug!(%action, ?interval, "arming repeating");
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
        self.arm(action, handle);
    }

    fn cancel(&self, action: Action) {
        if let Some(handle) = self.slots.lock().remove(&action) {
            tracing::debug!(%action, "cancelling schedule");
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.slots.lock().drain() {
            handle.abort();
        }
    }
}
