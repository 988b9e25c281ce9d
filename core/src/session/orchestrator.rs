//! Session orchestrator
//!
//! Single entry point [`SessionOrchestrator::handle`]: one trigger in, one
//! terminal outcome out. The orchestrator owns all state mutation and all
//! retry behavior; the portal client stays a dumb request/response layer.
//!
//! Nothing here holds authoritative state in memory across invocations:
//! every attempt rehydrates from the settings store, so a trigger handled
//! by a freshly started process behaves exactly like one handled by a
//! process that has been renewing for hours.

use crate::config::{SessionConfig, SettingsStore};
use crate::error::PortalError;
use crate::net::NetworkGate;
use crate::notify::StatusSink;
use crate::portal::PortalClient;
use crate::sched::Scheduler;
use crate::session::{Action, AttemptOutcome, RetryPolicy};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// How often an active session is renewed
pub const RENEW_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct SessionOrchestrator {
    store: SettingsStore,
    gate: Arc<dyn NetworkGate>,
    portal: PortalClient,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn StatusSink>,
    policy: RetryPolicy,
    /// Single-flight guard: overlapping triggers queue behind the one in
    /// flight instead of interleaving reads/writes of the session state.
    flight: tokio::sync::Mutex<()>,
}

impl SessionOrchestrator {
    pub fn new(
        store: SettingsStore,
        gate: Arc<dyn NetworkGate>,
        portal: PortalClient,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            store,
            gate,
            portal,
            scheduler,
            sink,
            policy: RetryPolicy::default(),
            flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one full cycle for `action`: bounded attempts with escalating
    /// backoff, then either a terminal outcome or a one-shot re-run armed
    /// after the give-up delay. The outcome is reported through the sink
    /// whatever branch was taken.
    pub async fn handle(&self, action: Action) -> AttemptOutcome {
        let _flight = self.flight.lock().await;
        tracing::info!(%action, "cycle started");

        let mut outcome = AttemptOutcome::default();
        for attempt in 1..=self.policy.max_attempts {
            outcome = self.attempt(action).await;
            if !outcome.retry {
                break;
            }
            match self.policy.backoff(attempt) {
                Some(delay) => {
                    tracing::info!(attempt, ?delay, "attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }

        if outcome.retry {
            // exhausted the budget; re-run the whole cycle later
            self.scheduler.schedule_once(self.policy.give_up_delay, action);
        }

        self.sink.report(action, &outcome);
        outcome
    }

    /// One pass of the decision procedure
    async fn attempt(&self, action: Action) -> AttemptOutcome {
        let mut outcome = AttemptOutcome::default();

        let mut config = match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "could not load session config");
                return outcome;
            }
        };

        // Hard gate: off the target network nothing is attempted, nothing
        // is scheduled. Retrying would just spin.
        if !self.gate.is_on_target(&config.target_ssid).await {
            tracing::info!(target = %config.target_ssid, "not on target network");
            return outcome;
        }

        if !config.is_complete() {
            tracing::warn!("credentials not configured, run setup first");
            return outcome;
        }

        let renew_allowed = config.renewal_allowed(Utc::now());
        tracing::debug!(%action, renew_allowed, "dispatching");

        match action {
            Action::KeepAlive if renew_allowed => {
                match config.portal_url.clone() {
                    Some(url) => {
                        outcome.success =
                            self.run_portal(self.portal.keep_alive(&url, &config.username).await);
                        if outcome.success {
                            self.scheduler
                                .schedule_repeating(RENEW_INTERVAL, Action::KeepAlive);
                        }
                    }
                    // URL lost (fresh process, cleared config): a full login
                    // recovers it and arms renewal itself
                    None => outcome.success = self.full_login(&mut config).await,
                }
                outcome.retry = !outcome.success;
            }

            Action::Login if renew_allowed => {
                let active = self.portal.probe_session_active().await;
                let known_url = config.portal_url.clone();
                if !active {
                    outcome.success = self.full_login(&mut config).await;
                    outcome.retry = !outcome.success;
                } else if let Some(url) = known_url {
                    // already authenticated by us; renew instead of
                    // re-posting credentials
                    outcome.success =
                        self.run_portal(self.portal.keep_alive(&url, &config.username).await);
                    if outcome.success {
                        self.scheduler
                            .schedule_repeating(RENEW_INTERVAL, Action::KeepAlive);
                    }
                    outcome.retry = !outcome.success;
                } else {
                    // A session is active but we never initiated it:
                    // without a URL no portal mutation is safe.
                    tracing::warn!("session active but not ours; logged in elsewhere");
                    outcome.logged_in_elsewhere = true;
                }
            }

            Action::Logout => {
                if let Some(url) = config.portal_url.clone() {
                    outcome.success =
                        self.run_portal(self.portal.logout(&url, &config.username).await);
                }
                // Best-effort: local renewal stops even when the server
                // call failed.
                self.scheduler.cancel(Action::KeepAlive);
                outcome.stop = true;
            }

            // Finite TTL lapsed: the user asked to stay signed in only for
            // so long. Only a fresh explicit login resets the window.
            Action::KeepAlive | Action::Login => {
                tracing::info!("stay-signed-in window lapsed, not renewing");
            }
        }

        outcome
    }

    /// Full login, discovering the portal URL first when unknown.
    /// Discovery failure reads as an ordinary login failure.
    async fn full_login(&self, config: &mut SessionConfig) -> bool {
        let url = match config.portal_url.clone() {
            Some(url) => url,
            None => match self.portal.discover_login_url().await {
                Ok(Some(url)) => {
                    config.portal_url = Some(url.clone());
                    self.persist(config);
                    url
                }
                Ok(None) => {
                    tracing::warn!("no login form discovered");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "login URL discovery failed");
                    return false;
                }
            },
        };

        let logged_in = self.run_portal(
            self.portal
                .login(&url, &config.username, &config.password)
                .await,
        );
        if logged_in {
            config.login_timestamp = Some(Utc::now());
            self.persist(config);
            self.scheduler
                .schedule_repeating(RENEW_INTERVAL, Action::KeepAlive);
        }
        logged_in
    }

    fn persist(&self, config: &SessionConfig) {
        if let Err(e) = self.store.save(config) {
            tracing::error!(error = %e, "failed to persist session config");
        }
    }

    /// Collapse a portal result into pass/fail, logging the error side
    fn run_portal(&self, result: Result<bool, PortalError>) -> bool {
        match result {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "portal request failed");
                false
            }
        }
    }
}
