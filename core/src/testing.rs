//! In-process transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Records every request and replays queued responses in order. With the
/// queue empty, `execute` fails the way an unreachable server would.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<HttpRequest>,
    responses: VecDeque<HttpResponse>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.state.lock().unwrap().responses.push_back(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }

    /// Body of the last request parsed as JSON.
    pub fn last_body(&self) -> serde_json::Value {
        let body = self.last_request().body.expect("last request had no body");
        serde_json::from_str(&body).unwrap()
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        state
            .responses
            .pop_front()
            .ok_or_else(|| Error::Transport("connection refused".into()))
    }
}

/// A client wired to `fake` with base URL `http://nocodb.test`.
pub(crate) fn client_with(fake: &FakeTransport) -> Client {
    Client::builder()
        .base_url("http://nocodb.test")
        .api_token("test-token")
        .transport(fake.clone())
        .build()
        .unwrap()
}
