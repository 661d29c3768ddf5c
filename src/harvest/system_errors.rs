//! Kernel and journal error excerpts gathered by an external collection script.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::error::AgentError;
use crate::harvest::record::{LogRecord, RecordLevel, SystemTag};
use crate::process::Cmd;

/// Script stdout: `{"dmesg": "...", "journal": "..."}`, either key optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ErrorExcerpts {
    #[serde(default)]
    pub dmesg: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
}

impl ErrorExcerpts {
    pub fn parse(stdout: &str) -> Result<Self, AgentError> {
        serde_json::from_str(stdout.trim()).map_err(|e| AgentError::ParseError {
            details: format!("error script output is not valid JSON: {}", e),
        })
    }

    /// One ERROR record per non-empty excerpt, or a single clean INFO record.
    pub fn into_records(self, limit: usize) -> Vec<LogRecord> {
        let mut records = Vec::new();
        for (label, excerpt) in [("Kernel errors", self.dmesg), ("Journal errors", self.journal)] {
            let Some(text) = excerpt.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let text = text.trim();
            records.push(
                LogRecord::new(SystemTag::SystemErrors, RecordLevel::Error, format!("{}: {}", label, truncate(text, limit)))
                    .with_raw(text),
            );
        }

        if records.is_empty() {
            records.push(LogRecord::new(
                SystemTag::SystemErrors,
                RecordLevel::Info,
                "No kernel or journal errors detected (clean)",
            ));
        }
        records
    }
}

/// Cuts at `limit` characters and marks the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

/// Runs the collection script and decodes its output.
pub async fn collect_excerpts(script: &Path, timeout: Duration) -> Result<ErrorExcerpts, AgentError> {
    let output = Cmd::new("bash").path_arg(script).timeout(timeout).run().await?;
    if !output.success() {
        return Err(AgentError::ProcessError {
            program: script.display().to_string(),
            details: output.error_text().to_string(),
        });
    }
    ErrorExcerpts::parse(&output.stdout)
}
