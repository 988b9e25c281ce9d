//! Session orchestration
//!
//! The decision procedure at the heart of portalkeep: given a trigger and
//! the current network/session state, decide which portal operation to
//! perform, how to interpret its outcome, how to retry, and what to
//! schedule next.

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{SessionOrchestrator, RENEW_INTERVAL};
pub use retry::RetryPolicy;

/// Trigger tag driving one orchestrator invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    KeepAlive,
    Logout,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Login => write!(f, "login"),
            Action::KeepAlive => write!(f, "keep_alive"),
            Action::Logout => write!(f, "logout"),
        }
    }
}

/// Result of one full orchestrator cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub success: bool,
    /// Whether the cycle considered the failure transient
    pub retry: bool,
    /// The portal reports a session this instance never initiated
    pub logged_in_elsewhere: bool,
    /// Logout completed; the long-running process should wind down
    pub stop: bool,
}
