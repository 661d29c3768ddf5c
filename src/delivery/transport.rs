//! HTTP transport for batch uploads and the connectivity probe.
//!
//! A transport error (`Err`) means the request never produced a response:
//! refused connection, DNS failure, timeout. Any HTTP status, including 4xx/5xx,
//! is a normal [`ApiResponse`] and is never retried here.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;

use crate::configs::DeliverySettings;
use crate::core::error::AgentError;
use crate::loggers::Logger;

const SNIPPET_LIMIT: usize = 1024;

/// Options for [`UploadClient`].
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Whole-request budget for an upload.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Budget for the connectivity probe.
    pub probe_timeout: Duration,
    pub user_agent: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&DeliverySettings::default())
    }
}

impl From<&DeliverySettings> for UploadOptions {
    fn from(s: &DeliverySettings) -> Self {
        Self {
            timeout: s.request_timeout(),
            connect_timeout: s.connect_timeout(),
            probe_timeout: s.probe_timeout(),
            user_agent: s.user_agent.clone(),
        }
    }
}

/// Response summary returned by [`UploadClient`].
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    /// 200 or 201; other 2xx codes are not accepted by the analysis endpoint.
    pub success: bool,
    /// Body text, truncated.
    pub body: String,
    pub headers: HeaderMap,
}

/// Plain-text multipart fields sent next to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFields {
    pub client_ip: String,
    pub hostname: String,
    pub source: String,
}

#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    logger: Logger,
    opts: UploadOptions,
}

impl UploadClient {
    pub fn new(logger: Logger) -> Result<Self, AgentError> {
        Self::new_with_opts(logger, UploadOptions::default())
    }

    pub fn new_with_opts(logger: Logger, opts: UploadOptions) -> Result<Self, AgentError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&opts.user_agent)
            .map_err(|e| AgentError::ConfigError(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(opts.timeout)
            .connect_timeout(opts.connect_timeout)
            .build()
            .map_err(|e| AgentError::HttpError(format!("Client build failed: {}", e)))?;

        Ok(Self { client, logger, opts })
    }

    pub fn options(&self) -> &UploadOptions {
        &self.opts
    }

    /// POSTs `file` as multipart field `file` (filename preserved) plus the three text fields.
    pub async fn upload(&self, url: &str, file: &Path, fields: &UploadFields) -> Result<ApiResponse, AgentError> {
        let bytes = tokio::fs::read(file).await.map_err(|e| AgentError::io(file, e))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "batch".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| AgentError::InternalError(format!("Invalid mime type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("client_ip", fields.client_ip.clone())
            .text("hostname", fields.hostname.clone())
            .text("source", fields.source.clone());

        crate::info!(self.logger, "Upload start", "url" => url, "file" => file_name, "source" => fields.source.as_str());

        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AgentError::HttpError(transport_reason(&e)))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        let body = if body.len() > SNIPPET_LIMIT {
            format!("{}...[truncated]", body.chars().take(SNIPPET_LIMIT).collect::<String>())
        } else {
            body
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            success: status == StatusCode::OK || status == StatusCode::CREATED,
            body,
            headers,
        })
    }

    /// GET with the probe budget; returns the status code.
    pub async fn probe(&self, url: &str) -> Result<u16, AgentError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.opts.probe_timeout)
            .send()
            .await
            .map_err(|e| AgentError::HttpError(transport_reason(&e)))?;
        Ok(resp.status().as_u16())
    }
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("transport error: {}", e)
    }
}
