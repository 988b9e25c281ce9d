//! Session configuration store
//!
//! Persists credentials, the target network and the session bookkeeping
//! the orchestrator needs across process restarts. The file is the sole
//! source of truth: every orchestrator invocation rehydrates from it, so
//! a freshly started process behaves the same as a long-running one.
//! Writes are last-write-wins, no transactions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// ISP account username
    #[serde(default)]
    pub username: String,

    /// ISP account password
    #[serde(default)]
    pub password: String,

    /// The only WiFi network this tool is allowed to operate on
    #[serde(default)]
    pub target_ssid: String,

    /// Discovered portal login URL; found lazily on first login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,

    /// "Stay signed in for N hours"; None = forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_ttl_hours: Option<u32>,

    /// When the last successful login happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_timestamp: Option<DateTime<Utc>>,

    /// Log in automatically when the target network appears
    #[serde(default = "default_true")]
    pub auto_login: bool,

    /// Decorate status reports with the scraped usage figure
    #[serde(default = "default_true")]
    pub notify: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            target_ssid: String::new(),
            portal_url: None,
            keep_alive_ttl_hours: None,
            login_timestamp: None,
            auto_login: true,
            notify: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// Check whether enough is configured to attempt a login
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.target_ssid.is_empty()
    }

    /// Whether renewing (or re-logging-in) is still permitted.
    ///
    /// Only a finite TTL that has already lapsed forbids it. Once lapsed,
    /// nothing renews until an explicit login refreshes the timestamp.
    pub fn renewal_allowed(&self, now: DateTime<Utc>) -> bool {
        match (self.keep_alive_ttl_hours, self.login_timestamp) {
            (Some(hours), Some(login)) => now < login + chrono::Duration::hours(i64::from(hours)),
            _ => true,
        }
    }
}

/// File-backed store for [`SessionConfig`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at the default location under the user config directory
    pub fn new() -> Result<Self> {
        let path = Self::default_path().context("Could not find config directory")?;
        Ok(Self { path })
    }

    /// Store at an explicit path (tests, `--config` override)
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("portalkeep").join("config.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration; a missing or empty file yields the defaults
    pub fn load(&self) -> Result<SessionConfig> {
        if !self.path.exists() {
            return Ok(SessionConfig::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(SessionConfig::default());
        }

        let parsed: SessionConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", self.path))?;

        Ok(parsed)
    }

    /// Save configuration atomically
    pub fn save(&self, config: &SessionConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to atomically write config file: {:?}", self.path))?;

        Ok(())
    }
}

fn atomic_write(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .context("Destination path has no parent directory")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent dir: {:?}", parent))?;

    let tmp = dest.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write temp file: {:?}", tmp))?;

    // Best-effort cleanup on failure.
    if let Err(rename_err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(rename_err).context("Failed to rename temp file into place");
    }

    Ok(())
}
