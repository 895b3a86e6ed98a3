// HTTP transport seam
//
// `HttpTransport` is the single boundary to the analytics backend. Production code uses
// `ReqwestTransport`; tests use scripted stubs so every outcome (non-2xx, wrong content type,
// timeouts) can be exercised without a server.

use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use url::Url;

use crate::error::{WizardError, WizardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the backend base URL, e.g. `api/tables`.
    pub path: &'static str,
    pub body: Option<serde_json::Value>,
}

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Body text; `None` when it could not be read.
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one request. Only network-level failures are errors here; any HTTP status is
    /// returned as a response.
    async fn send(&self, request: HttpRequest) -> WizardResult<HttpResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Parse the base URL and make sure it ends with `/`, so relative API paths keep any prefix.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash).map_err(|e| anyhow::anyhow!("Invalid backend URL '{}': {}", raw, e))
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out. Check that the analytics server is running.".to_string()
    } else if e.is_connect() {
        "Unable to reach the analytics server. Check the backend URL and network access."
            .to_string()
    } else {
        format!("Request failed: {}", e)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> WizardResult<HttpResponse> {
        let url = self
            .base_url
            .join(request.path)
            .map_err(|e| WizardError::Transport(format!("Invalid request URL: {}", e)))?;

        let builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| WizardError::Transport(describe_reqwest_error(&e)))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = match resp.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("[PHASE: http] [STEP: read_body] {} body unreadable: {}", url, e);
                None
            }
        };

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
