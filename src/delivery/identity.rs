//! Who is uploading: client address, host name and the source tag of a file.

use reqwest_middleware::ClientBuilder;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::path::Path;
use std::time::Duration;
use sysinfo::System;

use crate::core::error::AgentError;

pub const UNKNOWN: &str = "unknown";

/// Filename heuristics, first match wins.
const SOURCE_RULES: &[(&[&str], &str)] = &[
    (&["suricata", "eve.json"], "suricata"),
    (&["clamav", "antivirus"], "clamav"),
    (&["system_errors", "dmesg", "journal"], "system_errors"),
    (&["system", "syslog"], "system"),
    (&["auth", "login"], "auth"),
    (&["network"], "network"),
];

/// Source tag sent with an upload, derived from the file name only.
pub fn detect_source(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    SOURCE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| name.contains(n)))
        .map(|(_, tag)| *tag)
        .unwrap_or("user file")
}

pub fn local_hostname() -> String {
    System::host_name().filter(|h| !h.is_empty()).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Public address reported by an external lookup service, retried on transient failures.
pub async fn lookup_public_ip(url: &str, timeout: Duration) -> Result<String, AgentError> {
    let base = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::HttpError(format!("Client build failed: {}", e)))?;
    let client = ClientBuilder::new(base)
        .with(RetryTransientMiddleware::new_with_policy(
            ExponentialBackoff::builder().build_with_max_retries(1),
        ))
        .build();

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AgentError::HttpError(format!("IP lookup failed: {}", e)))?;
    if !resp.status().is_success() {
        return Err(AgentError::HttpError(format!("IP lookup returned {}", resp.status().as_u16())));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| AgentError::HttpError(format!("IP lookup read failed: {}", e)))?;
    let ip = text.trim();
    if ip.is_empty() {
        return Err(AgentError::HttpError("IP lookup returned an empty body".into()));
    }
    Ok(ip.to_string())
}

/// Address the local host name resolves to.
pub async fn resolve_hostname(host: &str) -> Result<String, AgentError> {
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| AgentError::HttpError(format!("Resolving {} failed: {}", host, e)))?;
    addrs
        .next()
        .map(|a| a.ip().to_string())
        .ok_or_else(|| AgentError::HttpError(format!("{} has no address", host)))
}

/// Lookup service, then local resolution, then `unknown`.
pub async fn resolve_client_ip(lookup_url: Option<&str>, timeout: Duration, hostname: &str) -> String {
    if let Some(url) = lookup_url {
        if let Ok(ip) = lookup_public_ip(url, timeout).await {
            return ip;
        }
    }
    resolve_hostname(hostname).await.unwrap_or_else(|_| UNKNOWN.to_string())
}
