// Scripted transports for deterministic tests (no server required).

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{WizardError, WizardResult};

pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        content_type: Some("application/json".to_string()),
        body: Some(body.to_string()),
    }
}

pub(crate) fn text_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        content_type: Some("text/plain; charset=utf-8".to_string()),
        body: Some(body.to_string()),
    }
}

/// Replays queued outcomes per path and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<HashMap<&'static str, VecDeque<WizardResult<HttpResponse>>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, path: &'static str, response: HttpResponse) -> Self {
        self.push(path, Ok(response));
        self
    }

    pub(crate) fn fail(self, path: &'static str, error: WizardError) -> Self {
        self.push(path, Err(error));
        self
    }

    fn push(&self, path: &'static str, outcome: WizardResult<HttpResponse>) {
        self.script
            .lock()
            .unwrap()
            .entry(path)
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> WizardResult<HttpResponse> {
        let path = request.path;
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| {
                Err(WizardError::Transport(format!(
                    "no scripted response for {}",
                    path
                )))
            })
    }
}
