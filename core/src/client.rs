//! The NocoDB client and its table handle.
//!
//! # Design
//! `Client` holds the base URL, the API token and a shared `Transport`; it
//! carries no mutable state between calls and is cheap to clone. Every
//! builder funnels into `Client::request`, which owns URL assembly, the
//! `xc-token` header, body serialization and status classification, so
//! the operation builders only describe *what* to send.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::ClientBuilder;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::query::QueryParams;

const TOKEN_HEADER: &str = "xc-token";

/// Client for the NocoDB v2 REST API.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    api_token: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(base_url: String, api_token: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            api_token,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle for the records and links of one table.
    ///
    /// An empty `table_id` is accepted here and reported as
    /// `Error::TableIdRequired` when an operation executes.
    pub fn table(&self, table_id: impl Into<String>) -> Table {
        Table {
            client: self.clone(),
            table_id: table_id.into(),
        }
    }

    /// Send one request and return the raw response body.
    ///
    /// `path` is relative to the base URL; a leading `/` is ignored. `body`,
    /// when present, is sent as JSON. Statuses >= 400 become errors.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &QueryParams,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let url = self.build_url(path, query)?;

        let mut headers = vec![(TOKEN_HEADER.to_string(), self.api_token.clone())];
        let body = match body {
            Some(value) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(value).map_err(Error::Serialization)?)
            }
            None => None,
        };

        debug!(%method, path, query_len = query.len(), "sending request");
        let response = self.transport.execute(HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        })?;
        trace!(status = response.status, bytes = response.body.len(), "received response");

        check_status(response)
    }

    /// `request` followed by JSON decoding of the body into `T`.
    pub(crate) fn request_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &QueryParams,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let raw = self.request(method, path, query, body, timeout)?;
        serde_json::from_str(&raw).map_err(Error::Deserialization)
    }

    fn build_url(&self, path: &str, query: &QueryParams) -> Result<String> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|source| Error::InvalidRequestUrl { url: raw.clone(), source })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url.into())
    }
}

/// Map statuses >= 400 to the matching `Error` variant, otherwise hand back
/// the body.
fn check_status(response: HttpResponse) -> Result<String> {
    if response.status < 400 {
        return Ok(response.body);
    }
    warn!(status = response.status, "request failed");

    let message = error_message(&response.body);
    if response.status == 404 {
        return Err(Error::NotFound {
            message: message.unwrap_or(response.body),
        });
    }
    match message {
        Some(message) => Err(Error::Api {
            status: response.status,
            message,
        }),
        None => Err(Error::UnexpectedStatus {
            status: response.status,
            body: response.body,
        }),
    }
}

/// Message from a NocoDB error body (`{"msg": ...}`, or `message`/`error`).
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_string))
}

/// A table in a NocoDB base. Entry point for record and link builders.
#[derive(Debug, Clone)]
pub struct Table {
    client: Client,
    table_id: String,
}

impl Table {
    pub fn id(&self) -> &str {
        &self.table_id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `api/v2/tables/{table_id}/records`
    pub(crate) fn records_path(&self) -> Result<String> {
        if self.table_id.is_empty() {
            return Err(Error::TableIdRequired);
        }
        Ok(format!("api/v2/tables/{}/records", self.table_id))
    }

    /// `api/v2/tables/{table_id}/links/{link_field_id}/records/{record_id}`
    pub(crate) fn links_path(&self, link_field_id: &str, record_id: u64) -> Result<String> {
        if self.table_id.is_empty() {
            return Err(Error::TableIdRequired);
        }
        if link_field_id.is_empty() {
            return Err(Error::LinkFieldIdRequired);
        }
        if record_id == 0 {
            return Err(Error::RecordIdRequired);
        }
        Ok(format!(
            "api/v2/tables/{}/links/{link_field_id}/records/{record_id}",
            self.table_id
        ))
    }
}
