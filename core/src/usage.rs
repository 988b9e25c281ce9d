//! Best-effort usage scrape
//!
//! Independent data source that logs into the ISP's account dashboard and
//! regex-extracts the transferred-data figure, used only to decorate
//! status output. Every failure collapses to `None`; nothing here may ever
//! influence a session-orchestration outcome.

use crate::config::SessionConfig;
use crate::http::{HttpMethod, HttpTransport};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// ISP account dashboard
pub const ACCOUNT_SITE: &str = "https://myaccount.adlkerala.com/";

pub struct UsageReporter {
    transport: Arc<dyn HttpTransport>,
    account_site: String,
    /// Session cookie from the dashboard login, kept for the lifetime of
    /// the reporter
    cookie: Mutex<Option<String>>,
}

impl UsageReporter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            account_site: ACCOUNT_SITE.to_string(),
            cookie: Mutex::new(None),
        }
    }

    pub fn with_account_site(mut self, url: impl Into<String>) -> Self {
        self.account_site = url.into();
        self
    }

    /// Transferred megabytes according to the dashboard, if reachable
    pub async fn transferred_mb(&self, config: &SessionConfig) -> Option<String> {
        let cached = self.cookie.lock().clone();
        let cookie = match cached {
            Some(cookie) => cookie,
            None => {
                let cookie = self.sign_in(&config.username, &config.password).await?;
                *self.cookie.lock() = Some(cookie.clone());
                cookie
            }
        };

        let headers = [("Cookie".to_string(), cookie)];
        let reply = self
            .transport
            .execute(HttpMethod::Get, &self.account_site, None, Some(&headers))
            .await
            .ok()?;
        if reply.status != 200 {
            return None;
        }
        extract_usage(&reply.body)
    }

    /// Log into the dashboard and capture the session cookie
    async fn sign_in(&self, username: &str, password: &str) -> Option<String> {
        if username.is_empty() {
            return None;
        }
        let form = [
            ("username".to_string(), username.to_string()),
            ("pass".to_string(), password.to_string()),
        ];
        let url = format!("{}login.php", self.account_site);
        let reply = self
            .transport
            .execute(HttpMethod::Post, &url, Some(&form), None)
            .await
            .ok()?;

        let cookie = reply.header("Set-Cookie")?;
        // keep only the name=value pair, drop attributes
        let cookie = cookie.split(';').next()?.trim();
        if cookie.is_empty() {
            None
        } else {
            Some(cookie.to_string())
        }
    }
}

/// Pull the data-transfer figure out of the dashboard HTML
fn extract_usage(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r#"(?s)<table.+Package Details.+?Data Transfer.+?class="celldata">([0-9].+?)&nbsp;.+?</table>"#,
        )
        .expect("valid usage regex")
    });
    re.captures(html).map(|c| c[1].to_string())
}
