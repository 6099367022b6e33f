//! Client configuration.
//!
//! `ClientBuilder` collects the base URL, API token, timeout and transport,
//! validates them once in `build`, and hands an immutable `Client` back.
//! `from_env` seeds the same builder from environment variables so
//! deployments can configure the client without code changes.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{Transport, UreqTransport};

/// Default overall timeout for a request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "NOCODB_BASE_URL";
pub const ENV_API_TOKEN: &str = "NOCODB_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "NOCODB_TIMEOUT_SECS";

/// Fluent builder for `Client`.
///
/// ```ignore
/// let client = Client::builder()
///     .base_url("https://app.nocodb.com")
///     .api_token(token)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    base_url: String,
    api_token: String,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
    deferred_error: Option<Error>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("transport", &self.transport)
            .finish()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder from `NOCODB_BASE_URL`, `NOCODB_API_TOKEN` and
    /// `NOCODB_TIMEOUT_SECS`. Unset variables leave the defaults in place;
    /// later builder calls override what the environment provided.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::new();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            builder = builder.api_token(token);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => builder = builder.timeout(Duration::from_secs(secs)),
                Err(_) => {
                    builder.deferred_error = Some(Error::InvalidConfig(format!(
                        "{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"
                    )))
                }
            }
        }
        builder
    }

    /// Root URL of the NocoDB instance. A trailing `/` is dropped.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Token sent in the `xc-token` header.
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = api_token.into();
        self
    }

    /// Overall timeout for each request made by the default transport.
    /// Ignored when a custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the default `ureq` transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<Client> {
        if let Some(err) = self.deferred_error {
            return Err(err);
        }
        if self.base_url.is_empty() {
            return Err(Error::BaseUrlRequired);
        }
        if self.api_token.is_empty() {
            return Err(Error::ApiTokenRequired);
        }
        Url::parse(&self.base_url)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new(self.timeout.unwrap_or(DEFAULT_TIMEOUT))),
        };

        Ok(Client::from_parts(self.base_url, self.api_token, transport))
    }
}
