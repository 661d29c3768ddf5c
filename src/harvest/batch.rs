use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::error::AgentError;
use crate::harvest::record::LogRecord;

/// Wire format of a batch artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// JSON array of [`LogRecord`].
    Json,
    /// Blank-line separated rendered event blocks.
    Text,
}

/// A batch file written to the shared temporary area, waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub path: PathBuf,
    pub format: BatchFormat,
    /// Records (JSON) or events (text) in the file.
    pub entries: usize,
}

impl Batch {
    /// Best-effort delete; a failure is ignored.
    pub async fn discard(&self) {
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}

/// `<prefix>_YYYYmmdd_HHMMSS_mmm.json` inside `dir`.
pub fn timestamped_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}_{}.json", prefix, Local::now().format("%Y%m%d_%H%M%S_%3f")))
}

pub async fn write_json_batch(path: PathBuf, records: &[LogRecord]) -> Result<Batch, AgentError> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| AgentError::InternalError(format!("Batch serialization failed: {}", e)))?;
    tokio::fs::write(&path, json).await.map_err(|e| AgentError::io(&path, e))?;
    Ok(Batch { path, format: BatchFormat::Json, entries: records.len() })
}
