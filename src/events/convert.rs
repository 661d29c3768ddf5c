//! Structured event log -> plain-text document conversion.

use chrono::Local;
use std::path::{Path, PathBuf};

use crate::core::error::AgentError;
use crate::events::formatter::EventFormatter;
use crate::events::model::IntrusionEvent;

/// Result of a conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    pub path: PathBuf,
    /// Number of events rendered; malformed lines are not counted.
    pub events: usize,
}

/// Decodes every well-formed line of `content`, silently skipping the rest.
pub fn parse_events(content: &str) -> Vec<IntrusionEvent> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| IntrusionEvent::parse_line(line).ok())
        .collect()
}

/// Default location for a converted document inside `dir`.
pub fn default_output_path(dir: &Path) -> PathBuf {
    dir.join(format!("suricata_logs_{}.txt", Local::now().format("%Y%m%d_%H%M%S_%3f")))
}

/// Like [`parse_events`] over raw bytes; lines that are not valid UTF-8 are skipped too.
pub fn parse_event_bytes(content: &[u8]) -> Vec<IntrusionEvent> {
    content
        .split(|b| *b == b'\n')
        .filter_map(|line| std::str::from_utf8(line).ok())
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| IntrusionEvent::parse_line(line).ok())
        .collect()
}

/// Converts a structured event file into the blank-line separated text document.
///
/// # Errors
/// Returns [`AgentError::IoError`] when the input cannot be read or the output cannot be written.
pub async fn convert_eve_to_text(input: &Path, output: Option<&Path>, out_dir: &Path) -> Result<ConvertedDocument, AgentError> {
    let content = tokio::fs::read(input)
        .await
        .map_err(|e| AgentError::io(input, e))?;

    let events = parse_event_bytes(&content);
    let document = EventFormatter::format_document(&events);

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output_path(out_dir),
    };
    tokio::fs::write(&path, document)
        .await
        .map_err(|e| AgentError::io(&path, e))?;

    Ok(ConvertedDocument { path, events: events.len() })
}
