//! Error types for the NocoDB client.
//!
//! # Design
//! A 404 maps to `NotFound`, which covers both a missing record and a
//! missing table. Every other status >= 400 lands in `Api` when the server
//! sent its usual `{"msg": ...}` body, or in `UnexpectedStatus` with the
//! raw body when it did not.
//!
//! Builder validation failures (`RecordIdRequired` and friends) are raised
//! by `execute` before any request leaves the process.

use thiserror::Error;

/// Errors returned by the client and its builders.
#[derive(Debug, Error)]
pub enum Error {
    /// `ClientBuilder::build` was called without a base URL.
    #[error("base URL is required")]
    BaseUrlRequired,

    /// `ClientBuilder::build` was called without an API token.
    #[error("API token is required")]
    ApiTokenRequired,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The request URL assembled from the base URL and an operation's path
    /// did not parse.
    #[error("invalid request URL {url:?}: {source}")]
    InvalidRequestUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A configuration value (usually from the environment) could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("table ID is required")]
    TableIdRequired,

    /// A record ID of zero was passed where a real row is required.
    #[error("record ID is required")]
    RecordIdRequired,

    #[error("link field ID is required")]
    LinkFieldIdRequired,

    /// Record data did not serialize to a JSON object.
    #[error("record data must serialize to a JSON object, got {0}")]
    InvalidPayload(&'static str),

    /// The server accepted a single create but returned no record ID.
    #[error("no record created")]
    NoRecordCreated,

    /// The server returned 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The server returned a status >= 400 with a decodable error body.
    #[error("status code {status}: API error: {message}")]
    Api { status: u16, message: String },

    /// The server returned a status >= 400 with a body that is not an API error.
    #[error("status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("failed to decode response: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The HTTP round-trip itself failed (DNS, connect, TLS, timeout, ...).
    #[error("failed to send request: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_includes_status() {
        let err = Error::Api {
            status: 422,
            message: "Invalid column".to_string(),
        };
        assert_eq!(err.to_string(), "status code 422: API error: Invalid column");
    }

    #[test]
    fn url_parse_error_converts() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::InvalidBaseUrl(_)));
    }
}
