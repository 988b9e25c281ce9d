pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod notify;
pub mod portal;
pub mod sched;
pub mod session;
pub mod usage;

// Re-exports for convenience
pub use config::{SessionConfig, SettingsStore};
pub use error::{PortalError, Result};
pub use session::{Action, AttemptOutcome, SessionOrchestrator};
