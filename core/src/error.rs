//! Error types for the Open311 client.
//!
//! # Design
//! Only caller mistakes surface as `Open311Error`: a misconfigured client, a
//! record built from incomplete data, or a record that no longer satisfies its
//! own required fields at post time. Everything that goes wrong on the wire is
//! a `TransportError`, which the read operations degrade to `None` instead of
//! returning. `Open311Error::Transport` exists for the one place a transport
//! error is fatal: building the default transport at construction time.

use thiserror::Error;

/// Errors returned to callers of the Open311 client.
#[derive(Debug, Error)]
pub enum Open311Error {
    /// A required client setting (endpoint, jurisdiction id) is missing or blank.
    #[error("invalid configuration value: {0}")]
    InvalidConfiguration(String),

    /// Record input was not a non-empty JSON object.
    #[error("invalid input data")]
    InvalidInput,

    /// A required record field is absent or blank.
    #[error("required field missing: {0}")]
    MissingRequiredField(String),

    /// The record handed to `post_service_request` fails its own validation.
    #[error("invalid service request")]
    InvalidServiceRequest,

    /// A URL was requested with an empty command or format.
    #[error("invalid command")]
    InvalidCommand,

    /// The transport could not be constructed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration sources could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for Open311Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Errors raised by a `Transport` or while decoding its responses.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint is not a usable base URI.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// The body decoded but did not have the expected shape.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// The request parameters could not be encoded.
    #[error("encoding failed: {0}")]
    Encode(String),
}
