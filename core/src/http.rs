//! HTTP transport types and the default blocking transport.
//!
//! # Design
//! Requests and responses are described as plain data. The client builds an
//! `HttpRequest` and hands it to a `Transport`, which performs the round-trip
//! and returns the status, headers and body as an `HttpResponse`. Status
//! codes are never treated as transport failures here; classification
//! happens in `Client::request` so every transport behaves the same.
//!
//! `UreqTransport` is the production implementation. Tests substitute an
//! in-process transport that records requests and replays canned responses.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the encoded query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Overrides the transport's default timeout for this request only.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes one HTTP round-trip.
///
/// Implementations must return 4xx/5xx responses as `Ok(HttpResponse)` and
/// reserve `Err` for failures where no response was received.
pub trait Transport: Send + Sync + fmt::Debug {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build a transport whose requests time out after `timeout` overall.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap an agent configured by the caller. The agent must be configured
    /// with `http_status_as_error(false)` so error statuses reach the client.
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let response = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(url), &request).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(self.agent.post(url), &request).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => prepare(self.agent.post(url), &request).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                prepare(self.agent.patch(url), &request).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => prepare(self.agent.patch(url), &request).send_empty(),
            // NocoDB takes the IDs to delete in the body of a DELETE.
            (HttpMethod::Delete, Some(body)) => {
                prepare(self.agent.delete(url).force_send_body(), &request).send(body.as_bytes())
            }
            (HttpMethod::Delete, None) => prepare(self.agent.delete(url), &request).call(),
        };
        let mut response = response.map_err(|e| Error::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Transport(Box::new(e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Attach headers and the per-request timeout to a ureq request.
fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = request.timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".to_string(),
            headers: vec![("xc-token".to_string(), "secret".to_string())],
            body: None,
            timeout: None,
        };
        assert_eq!(req.header("XC-Token"), Some("secret"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn method_renders_uppercase() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
