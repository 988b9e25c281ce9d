//! Captive-portal protocol operations
//!
//! The four portal operations (probe, login, keep-alive, logout) plus the
//! login-URL discovery sub-protocol. All of them are pure request/response
//! exchanges over the injected [`HttpTransport`]; retry policy and state
//! mutation belong to the session orchestrator, never here.

use crate::error::Result;
use crate::http::{HttpMethod, HttpTransport};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Reference site used to detect whether traffic is being intercepted.
/// Plain http on purpose: an https probe would fail the TLS handshake at
/// the portal instead of showing us the redirect.
pub const REFERENCE_SITE: &str = "http://www.reddit.com";

// login form
const FIELD_AUTH_USER: &str = "auth_user";
const FIELD_AUTH_PASS: &str = "auth_pass";
const FIELD_AUTH_ACCEPT: &str = "accept";
const FIELD_AUTH_ACCEPT_VALUE: &str = "Login >>";
const FIELD_AUTH_REDIR_URL: &str = "redirurl";
const FIELD_AUTH_REDIR_URL_VALUE: &str = "$PORTAL_REDIRURL$";

// keep alive
const FIELD_ALIVE: &str = "alive";
const FIELD_ALIVE_VALUE: &str = "y";

// logout
const FIELD_LOGOUT_ID: &str = "logout_id";
const FIELD_LOGOUT: &str = "logout";
const FIELD_LOGOUT_VALUE: &str = "Logout";

/// Absolute-URL shape a login form's action must have to be trusted
const URL_PATTERN: &str =
    r"^(https?|ftp|file)://[-a-zA-Z0-9+&@#/%?=~_|!:,.;]*[-a-zA-Z0-9+&@#/%=~_|]";

/// Client for the portal's login/renewal/logout endpoints
pub struct PortalClient {
    transport: Arc<dyn HttpTransport>,
    reference_site: String,
}

impl PortalClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            reference_site: REFERENCE_SITE.to_string(),
        }
    }

    /// Override the reference site (tests, regional mirrors)
    pub fn with_reference_site(mut self, url: impl Into<String>) -> Self {
        self.reference_site = url.into();
        self
    }

    /// Check whether a session is currently authenticated.
    ///
    /// A 200 from the reference site means traffic is flowing; anything
    /// else, including transport failures, reads as "not logged in" so the
    /// caller errs toward attempting a login rather than silently idling.
    pub async fn probe_session_active(&self) -> bool {
        match self
            .transport
            .execute(HttpMethod::Head, &self.reference_site, None, None)
            .await
        {
            Ok(reply) => {
                tracing::debug!(status = reply.status, "session probe");
                reply.status == 200
            }
            Err(e) => {
                tracing::debug!(error = %e, "session probe failed, assuming inactive");
                false
            }
        }
    }

    /// Discover the portal's login URL by following its interception.
    ///
    /// GET the reference site; a 302 hands us the portal's address in
    /// `Location`. We reduce that to scheme+authority, fetch the page and
    /// take the first form action that looks like an absolute URL.
    /// `Ok(None)` means no interception or no usable form was seen.
    pub async fn discover_login_url(&self) -> Result<Option<String>> {
        let reply = self
            .transport
            .execute(HttpMethod::Get, &self.reference_site, None, None)
            .await?;
        if reply.status != 302 {
            tracing::debug!(status = reply.status, "reference site not redirecting");
            return Ok(None);
        }

        let Some(location) = reply.header("Location") else {
            return Ok(None);
        };
        tracing::info!(location, "redirected by portal");

        let Some(origin) = reduce_to_origin(location) else {
            return Ok(None);
        };

        let page = self
            .transport
            .execute(HttpMethod::Get, &origin, None, None)
            .await?;
        if page.status != 200 {
            return Ok(None);
        }

        let found = find_form_action(&page.body);
        if let Some(url) = &found {
            tracing::info!(url, "found login form action");
        }
        Ok(found)
    }

    /// Submit credentials to the portal. Success iff HTTP 200.
    pub async fn login(&self, url: &str, username: &str, password: &str) -> Result<bool> {
        tracing::info!("login initiated");
        let form = [
            (FIELD_AUTH_USER.to_string(), username.to_string()),
            (FIELD_AUTH_PASS.to_string(), password.to_string()),
            (
                FIELD_AUTH_ACCEPT.to_string(),
                FIELD_AUTH_ACCEPT_VALUE.to_string(),
            ),
            (
                FIELD_AUTH_REDIR_URL.to_string(),
                FIELD_AUTH_REDIR_URL_VALUE.to_string(),
            ),
        ];
        let reply = self
            .transport
            .execute(HttpMethod::Post, url, Some(&form), None)
            .await?;
        tracing::info!(status = reply.status, "login response");
        Ok(reply.status == 200)
    }

    /// Renew an active session. Success iff HTTP 200 or 204.
    pub async fn keep_alive(&self, url: &str, username: &str) -> Result<bool> {
        tracing::info!("keep alive initiated");
        let form = [
            (FIELD_AUTH_USER.to_string(), username.to_string()),
            (FIELD_ALIVE.to_string(), FIELD_ALIVE_VALUE.to_string()),
        ];
        let reply = self
            .transport
            .execute(HttpMethod::Post, url, Some(&form), None)
            .await?;
        tracing::info!(status = reply.status, "keep alive response");
        Ok(reply.status == 200 || reply.status == 204)
    }

    /// End the session. Success iff HTTP 200.
    pub async fn logout(&self, url: &str, username: &str) -> Result<bool> {
        tracing::info!("logout initiated");
        let form = [
            (FIELD_LOGOUT_ID.to_string(), username.to_string()),
            (FIELD_LOGOUT.to_string(), FIELD_LOGOUT_VALUE.to_string()),
        ];
        let reply = self
            .transport
            .execute(HttpMethod::Post, url, Some(&form), None)
            .await?;
        tracing::info!(status = reply.status, "logout response");
        Ok(reply.status == 200)
    }
}

/// Reduce a URL to scheme://authority
fn reduce_to_origin(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let mut origin = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{}", port));
    }
    Some(origin)
}

/// First `<form action="...">` whose action is an absolute URL
fn find_form_action(html: &str) -> Option<String> {
    static FORM_RE: OnceLock<Regex> = OnceLock::new();
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let form_re = FORM_RE.get_or_init(|| {
        Regex::new(r#"(?is)<form[^>]*\baction\s*=\s*["']([^"']+)["']"#).expect("valid form regex")
    });
    let url_re = URL_RE.get_or_init(|| Regex::new(URL_PATTERN).expect("valid url regex"));

    for captures in form_re.captures_iter(html) {
        let action = captures[1].trim();
        if url_re.is_match(action) {
            return Some(action.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockTransport;
    use crate::http::HttpReply;

    fn client(transport: &Arc<MockTransport>) -> PortalClient {
        PortalClient::new(transport.clone() as Arc<dyn HttpTransport>)
    }

    #[tokio::test]
    async fn test_probe_active_on_200() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(200);
        assert!(client(&transport).probe_session_active().await);
        assert_eq!(transport.requests()[0].method, HttpMethod::Head);
    }

    #[tokio::test]
    async fn test_probe_inactive_on_redirect() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(302);
        assert!(!client(&transport).probe_session_active().await);
    }

    #[tokio::test]
    async fn test_probe_fails_closed_on_transport_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error();
        assert!(!client(&transport).probe_session_active().await);
    }

    #[tokio::test]
    async fn test_discovery_follows_redirect_to_form_action() {
        let transport = Arc::new(MockTransport::new());
        transport.push_reply(HttpReply {
            status: 302,
            headers: vec![(
                "Location".to_string(),
                "http://portal.example/redir?foo=1".to_string(),
            )],
            body: String::new(),
        });
        transport.push_reply(HttpReply {
            status: 200,
            headers: vec![],
            body: r#"<html><body>
                <form method="post" action="http://portal.example/login">
                </form></body></html>"#
                .to_string(),
        });

        let found = client(&transport).discover_login_url().await.unwrap();
        assert_eq!(found.as_deref(), Some("http://portal.example/login"));

        // the redirect target must be reduced to its origin before the GET
        let requests = transport.requests();
        assert_eq!(requests[1].url, "http://portal.example");
    }

    #[tokio::test]
    async fn test_discovery_none_without_redirect() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(200);
        let found = client(&transport).discover_login_url().await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_discovery_skips_relative_form_actions() {
        let transport = Arc::new(MockTransport::new());
        transport.push_reply(HttpReply {
            status: 302,
            headers: vec![("Location".to_string(), "http://portal.example/".to_string())],
            body: String::new(),
        });
        transport.push_reply(HttpReply {
            status: 200,
            headers: vec![],
            body: r#"<form action="/local/login"></form>
                     <form action="https://portal.example/auth/index.php"></form>"#
                .to_string(),
        });

        let found = client(&transport).discover_login_url().await.unwrap();
        assert_eq!(
            found.as_deref(),
            Some("https://portal.example/auth/index.php")
        );
    }

    #[tokio::test]
    async fn test_login_posts_credential_form() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(200);

        let ok = client(&transport)
            .login("http://portal.example/login", "alice", "hunter2")
            .await
            .unwrap();
        assert!(ok);

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.form_field("auth_user"), Some("alice"));
        assert_eq!(request.form_field("auth_pass"), Some("hunter2"));
        assert_eq!(request.form_field("accept"), Some("Login >>"));
        assert_eq!(request.form_field("redirurl"), Some("$PORTAL_REDIRURL$"));
    }

    #[tokio::test]
    async fn test_keep_alive_accepts_204() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(204);
        let ok = client(&transport)
            .keep_alive("http://portal.example/login", "alice")
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(transport.requests()[0].form_field("alive"), Some("y"));
    }

    #[tokio::test]
    async fn test_logout_posts_logout_marker() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(200);
        let ok = client(&transport)
            .logout("http://portal.example/login", "alice")
            .await
            .unwrap();
        assert!(ok);
        let request = &transport.requests()[0];
        assert_eq!(request.form_field("logout_id"), Some("alice"));
        assert_eq!(request.form_field("logout"), Some("Logout"));
    }

    #[test]
    fn test_reduce_to_origin_keeps_port() {
        assert_eq!(
            reduce_to_origin("http://portal.example:8000/redir?x=1").as_deref(),
            Some("http://portal.example:8000")
        );
        assert_eq!(
            reduce_to_origin("https://portal.example/a/b").as_deref(),
            Some("https://portal.example")
        );
        assert!(reduce_to_origin("not a url").is_none());
    }
}
