//! Bounded-retry policy
//!
//! Kept separate from the orchestrator so the attempt/backoff/give-up
//! shape is testable without any I/O. What gets scheduled after the final
//! outcome is the orchestrator's business, not this type's.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per cycle, first one included
    pub max_attempts: u32,
    /// Escalating backoff unit; attempt n sleeps (n + 1) * step
    pub backoff_step: Duration,
    /// One-shot re-run delay armed after the whole cycle is exhausted
    pub give_up_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(3),
            give_up_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Sleep to take after failed attempt `attempt` (1-based), or None when
    /// the budget is spent and the cycle should give up instead.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.backoff_step * (attempt + 1))
        } else {
            None
        }
    }
}
