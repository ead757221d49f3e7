//! HTTP transport boundary.
//!
//! # Design
//! Requests and responses are plain data. The protocol client builds an
//! `HttpRequest` with a path relative to the jurisdiction endpoint and hands it
//! to a `Transport`, which owns the base URL and performs the I/O. Tests swap
//! in `mock::StubTransport`; production code uses `UreqTransport`.
//!
//! Transports are used from one thread at a time. Nothing here requires
//! `Send` or `Sync`; callers sharing a client across threads must synchronize
//! it themselves.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::TransportError;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
///
/// `path` is relative to the transport's base URL and already carries any
/// query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build a POST whose body is `form` encoded as
    /// `application/x-www-form-urlencoded`.
    pub fn post_form(path: impl Into<String>, form: &Map<String, Value>) -> Result<Self, TransportError> {
        let body = serde_urlencoded::to_string(form_pairs(form)).map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(Self {
            method: HttpMethod::Post,
            path: path.into(),
            headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(body),
        })
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// The capability the protocol client needs from an HTTP library.
pub trait Transport {
    /// Execute one request and return whatever the server answered,
    /// including non-2xx statuses.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    fn get(&self, path: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::get(path))
    }

    fn post(&self, path: &str, form: &Map<String, Value>) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::post_form(path, form)?)
    }
}

/// Flatten a JSON object into form pairs. Nulls are omitted; scalars are
/// rendered as text; nested values are sent as their JSON text.
fn form_pairs(form: &Map<String, Value>) -> Vec<(&str, String)> {
    form.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(true) => "1".to_string(),
                Value::Bool(false) => "0".to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key.as_str(), text))
        })
        .collect()
}

/// Blocking transport backed by `ureq`, bound to one endpoint.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport for `endpoint`. Status codes are returned as data,
    /// never as errors, so the protocol client decides what a failure is.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        let uri: ureq::http::Uri = base_url.parse().map_err(|e: ureq::http::uri::InvalidUri| {
            TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }

        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();

        Ok(Self { base_url, agent })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
