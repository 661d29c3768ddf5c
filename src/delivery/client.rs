//! # Delivery Client
//!
//! Uploads a batch file to the analysis endpoint. The built-in HTTP transport is
//! tried first; only a transport failure (no response at all) switches to the
//! command-line fallback. Every path ends in a [`DeliveryOutcome`], never an error.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::configs::DeliverySettings;
use crate::core::error::AgentError;
use crate::delivery::fallback::CommandLineUpload;
use crate::delivery::identity::{detect_source, local_hostname, resolve_client_ip};
use crate::delivery::transport::{UploadClient, UploadFields, UploadOptions};
use crate::events::convert_eve_to_text;
use crate::harvest::LogNormalizer;
use crate::loggers::Logger;
use crate::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    Fallback,
}

/// What happened to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    /// Transport that produced the final answer; `None` if nothing was sent.
    pub transport: Option<Transport>,
    /// HTTP status when the built-in transport got a response.
    pub status: Option<u16>,
    pub message: String,
}

impl DeliveryOutcome {
    fn not_sent(message: impl Into<String>) -> Self {
        Self { delivered: false, transport: None, status: None, message: message.into() }
    }
}

/// True for structured event logs (`*.json` named after the detection engine).
pub fn is_structured_event_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    is_json && (name.contains("suricata") || name.contains("eve.json"))
}

/// Endpoint origin used by the connectivity probe: `suffix` stripped from the end of `url`.
pub fn probe_url(url: &str, suffix: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let stripped = if suffix.is_empty() { trimmed } else { trimmed.strip_suffix(suffix).unwrap_or(trimmed) };
    if stripped.is_empty() { url.to_string() } else { stripped.to_string() }
}

pub struct DeliveryClient {
    http: UploadClient,
    fallback: CommandLineUpload,
    settings: DeliverySettings,
    work_dir: PathBuf,
    logger: Logger,
}

impl DeliveryClient {
    /// `work_dir` receives converted text documents.
    pub fn new(settings: DeliverySettings, work_dir: impl Into<PathBuf>, logger: Logger) -> Result<Self, AgentError> {
        let http = UploadClient::new_with_opts(logger.clone(), UploadOptions::from(&settings))?;
        let fallback = CommandLineUpload {
            program: settings.fallback_program.clone(),
            connect_timeout: settings.connect_timeout(),
            max_time: settings.request_timeout(),
        };
        Ok(Self { http, fallback, settings, work_dir: work_dir.into(), logger })
    }

    pub async fn deliver(&self, file: &Path, url: &str, convert_if_suricata: bool) -> bool {
        self.deliver_detailed(file, url, convert_if_suricata).await.delivered
    }

    pub async fn deliver_detailed(&self, file: &Path, url: &str, convert_if_suricata: bool) -> DeliveryOutcome {
        if !file.is_file() {
            error!(self.logger, "File to send does not exist", "path" => file.display().to_string());
            return DeliveryOutcome::not_sent(format!("File {} does not exist", file.display()));
        }

        let mut converted: Option<PathBuf> = None;
        if convert_if_suricata && is_structured_event_file(file) {
            match convert_eve_to_text(file, None, &self.work_dir).await {
                Ok(doc) => {
                    info!(self.logger, "Event log converted for upload", "path" => doc.path.display().to_string(), "events" => doc.events);
                    converted = Some(doc.path);
                }
                Err(e) => {
                    warn!(self.logger, "Event log conversion failed, sending the original", "error" => e.to_string());
                }
            }
        }
        let payload = converted.as_deref().unwrap_or(file);

        let hostname = local_hostname();
        let client_ip = resolve_client_ip(
            self.settings.ip_lookup_url.as_deref(),
            std::time::Duration::from_secs(self.settings.ip_lookup_timeout_secs),
            &hostname,
        )
        .await;
        let fields = UploadFields { client_ip, hostname, source: detect_source(file).to_string() };

        let outcome = match self.http.upload(url, payload, &fields).await {
            Ok(resp) if resp.success => {
                info!(self.logger, "File delivered", "status" => resp.status, "path" => payload.display().to_string());
                DeliveryOutcome {
                    delivered: true,
                    transport: Some(Transport::Http),
                    status: Some(resp.status),
                    message: format!("Delivered with status {}", resp.status),
                }
            }
            Ok(resp) => {
                let snippet: String = resp.body.chars().take(100).collect();
                warn!(self.logger, "Endpoint rejected upload", "status" => resp.status, "body" => snippet.as_str());
                DeliveryOutcome {
                    delivered: false,
                    transport: Some(Transport::Http),
                    status: Some(resp.status),
                    message: format!("HTTP {}: {}", resp.status, snippet),
                }
            }
            Err(AgentError::HttpError(reason)) => {
                warn!(self.logger, "HTTP transport failed, trying fallback", "reason" => reason.as_str());
                self.deliver_fallback(payload, url, &fields).await
            }
            Err(e) => {
                error!(self.logger, "Upload could not be prepared", "error" => e.to_string());
                DeliveryOutcome::not_sent(e.to_string())
            }
        };

        if outcome.delivered {
            if let Some(path) = &converted {
                let _ = tokio::fs::remove_file(path).await;
            }
        }
        outcome
    }

    async fn deliver_fallback(&self, payload: &Path, url: &str, fields: &UploadFields) -> DeliveryOutcome {
        match self.fallback.send(url, payload, fields).await {
            Ok(()) => {
                info!(self.logger, "File delivered via fallback", "program" => self.fallback.program.as_str());
                DeliveryOutcome {
                    delivered: true,
                    transport: Some(Transport::Fallback),
                    status: None,
                    message: format!("Delivered via {}", self.fallback.program),
                }
            }
            Err(e) => {
                error!(self.logger, "Fallback transport failed", "error" => e.to_string());
                DeliveryOutcome {
                    delivered: false,
                    transport: Some(Transport::Fallback),
                    status: None,
                    message: e.to_string(),
                }
            }
        }
    }

    /// GET on the endpoint origin; only 200 counts.
    pub async fn test_connection(&self, url: &str) -> bool {
        let target = probe_url(url, &self.settings.api_suffix);
        match self.http.probe(&target).await {
            Ok(200) => {
                info!(self.logger, "Endpoint reachable", "url" => target.as_str());
                true
            }
            Ok(status) => {
                warn!(self.logger, "Endpoint answered with unexpected status", "url" => target.as_str(), "status" => status);
                false
            }
            Err(e) => {
                error!(self.logger, "Endpoint unreachable", "url" => target.as_str(), "error" => e.to_string());
                false
            }
        }
    }

    /// Builds a batch of `count` test records, delivers it and deletes it.
    pub async fn send_test_file(&self, normalizer: &LogNormalizer, url: &str, count: usize) -> bool {
        let batch = match normalizer.create_test_batch(count).await {
            Ok(b) => b,
            Err(e) => {
                error!(self.logger, "Test batch could not be written", "error" => e.to_string());
                return false;
            }
        };
        let delivered = self.deliver(&batch.path, url, false).await;
        batch.discard().await;
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_strips_api_suffix() {
        assert_eq!(probe_url("http://10.8.0.5:8000/api/analyze_file", "/api/analyze_file"), "http://10.8.0.5:8000");
        assert_eq!(probe_url("http://h:1/api/analyze_file/", "/api/analyze_file"), "http://h:1");
        assert_eq!(probe_url("http://h:1/other", "/api/analyze_file"), "http://h:1/other");
    }

    #[test]
    fn only_json_event_logs_are_converted() {
        assert!(is_structured_event_file(Path::new("/var/log/suricata/eve.json")));
        assert!(is_structured_event_file(Path::new("/tmp/suricata_dump.json")));
        assert!(!is_structured_event_file(Path::new("/tmp/suricata_logs_20240101.txt")));
        assert!(!is_structured_event_file(Path::new("/tmp/system_logs_20240101.json")));
    }
}
