//! HTTP transport seam
//!
//! The portal protocol only needs "perform a request, observe status,
//! headers and body". That capability lives behind [`HttpTransport`] so the
//! portal client and orchestrator can be exercised against a scripted
//! transport in tests. The production implementation is a thin reqwest
//! wrapper with the quirks a captive portal demands: redirects must be
//! observed as 3xx responses rather than followed, and the user agent is a
//! fixed browser string so the ISP cannot single us out.

use crate::error::{PortalError, Result};
use std::time::Duration;

/// Connect/read timeout for every portal request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Fixed browser user agent; requests should be indistinguishable from a
/// person filling in the portal form.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/28.0.1468.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Head => write!(f, "HEAD"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// What came back from the wire
#[derive(Debug, Clone, Default)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// First header value matching `name`, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Injected HTTP capability consumed by the portal client
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        form: Option<&[(String, String)]>,
        extra_headers: Option<&[(String, String)]>,
    ) -> Result<HttpReply>;
}

/// Production transport backed by a reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PortalError::ConnectionFailed {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        form: Option<&[(String, String)]>,
        extra_headers: Option<&[(String, String)]>,
    ) -> Result<HttpReply> {
        tracing::debug!(%method, url, "http request");

        let mut request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Head => self.client.head(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        if let Some(form) = form {
            request = match method {
                // POST/PUT carry the fields url-encoded in the body
                HttpMethod::Post | HttpMethod::Put => request.form(form),
                // everything else appends them as a query string
                _ => request.query(form),
            };
        }

        if let Some(headers) = extra_headers {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.text().await?;

        tracing::trace!(status, "http response");
        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by portal / orchestrator / usage tests

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: HttpMethod,
        pub url: String,
        pub form: Option<Vec<(String, String)>>,
    }

    impl RecordedRequest {
        pub fn form_field(&self, name: &str) -> Option<&str> {
            self.form
                .as_ref()?
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Pops one scripted reply per request; an exhausted script answers
    /// with a connection failure.
    #[derive(Default)]
    pub struct MockTransport {
        replies: Mutex<VecDeque<Result<HttpReply>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_status(&self, status: u16) {
            self.push_reply(HttpReply::with_status(status));
        }

        pub fn push_reply(&self, reply: HttpReply) {
            self.replies.lock().push_back(Ok(reply));
        }

        pub fn push_error(&self) {
            self.replies.lock().push_back(Err(PortalError::ConnectionFailed {
                message: "scripted failure".to_string(),
            }));
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(
            &self,
            method: HttpMethod,
            url: &str,
            form: Option<&[(String, String)]>,
            _extra_headers: Option<&[(String, String)]>,
        ) -> Result<HttpReply> {
            self.requests.lock().push(RecordedRequest {
                method,
                url: url.to_string(),
                form: form.map(|f| f.to_vec()),
            });

            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(PortalError::ConnectionFailed {
                        message: "no scripted reply".to_string(),
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let reply = HttpReply {
            status: 302,
            headers: vec![("Location".to_string(), "http://portal.example/".to_string())],
            body: String::new(),
        };
        assert_eq!(reply.header("location"), Some("http://portal.example/"));
        assert_eq!(reply.header("LOCATION"), Some("http://portal.example/"));
        assert_eq!(reply.header("Set-Cookie"), None);
    }
}
