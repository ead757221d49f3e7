//! Canned-response transport for tests.
//!
//! Queue responses with the `push_*` methods, hand the stub to
//! `ProtocolClient::with_transport`, then inspect `requests()` to see what the
//! client sent. An empty queue answers with a `TransportError::Request`, the
//! same as an unreachable server.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub whose first response is `body` with status 200.
    pub fn with_json(body: Value) -> Self {
        let stub = Self::new();
        stub.push_json(200, body);
        stub
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_body(status, &body.to_string());
    }

    pub fn push_body(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no stubbed response".to_string())))
    }
}
