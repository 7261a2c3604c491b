//! HTTP execution boundary.
//!
//! [`HttpTransport`] is the injected capability that performs exactly one request/response
//! exchange. The default [`ReqwestTransport`] shares a single `reqwest::Client` (and its
//! connection pool) across all invocations.

use crate::config::ToolsConfig;
use crate::error::{Result, SwaggerToolsError};
use crate::request::PreparedRequest;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Status and fully-read body of a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one request. Any failure to obtain a response is a
    /// [`SwaggerToolsError::Transport`]; HTTP error statuses are returned as responses.
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
    max_response_bytes: Option<usize>,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            max_response_bytes: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ToolsConfig, client: reqwest::Client) -> Self {
        Self::new(client)
            .with_timeout(config.request_timeout())
            .with_max_response_bytes(config.max_response_bytes)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_response_bytes(mut self, max: Option<usize>) -> Self {
        self.max_response_bytes = max;
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method.to_reqwest(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SwaggerToolsError::Transport(sanitize_reqwest_error(&e)))?;
        let status = response.status().as_u16();
        let bytes = read_body_limited(response, self.max_response_bytes)
            .await
            .map_err(SwaggerToolsError::Transport)?;

        Ok(RawResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Read a response body, refusing to buffer more than `max_bytes`.
pub(crate) async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> std::result::Result<Vec<u8>, String> {
    let Some(max) = max_bytes else {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| sanitize_reqwest_error(&e))?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(format!("Response too large: {len} bytes (limit {max})"));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| sanitize_reqwest_error(&e))?
    {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(format!("Response too large: exceeded {max} bytes"));
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

/// URL safe for logs: no userinfo, query, or fragment.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    if e.is_timeout() && !msg.contains("timed out") {
        msg.push_str(" (timed out)");
    }
    msg
}
