//! # Operation Outcome
//!
//! Structured success/failure value returned across component boundaries.
//! Only the presentation layer turns it into a decorated string via `Display`.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    TimedOut,
}

/// Result of an externally visible operation (install step, service control, scan...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub message: String,
    /// Captured error stream or extra context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: OutcomeStatus::Succeeded, message: message.into(), detail: None }
    }

    pub fn failure(message: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status: OutcomeStatus::Failed,
            message: message.into(),
            detail: if detail.trim().is_empty() { None } else { Some(detail.trim().to_string()) },
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self { status: OutcomeStatus::TimedOut, message: message.into(), detail: None }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

impl From<crate::core::error::AgentError> for Outcome {
    fn from(err: crate::core::error::AgentError) -> Self {
        match err {
            crate::core::error::AgentError::Timeout { operation, secs } => {
                Outcome::timeout(format!("Timeout in {} ({}s)", operation, secs))
            }
            other => Outcome::failure("Operation failed", other.to_string()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.detail) {
            (OutcomeStatus::Succeeded, None) => write!(f, "✅ {}", self.message),
            (OutcomeStatus::Succeeded, Some(d)) => write!(f, "✅ {} ({})", self.message, d),
            (OutcomeStatus::Failed, None) => write!(f, "❌ {}", self.message),
            (OutcomeStatus::Failed, Some(d)) => write!(f, "❌ {}: {}", self.message, d),
            (OutcomeStatus::TimedOut, _) => write!(f, "⏱ {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AgentError;

    #[test]
    fn blank_detail_is_dropped() {
        let o = Outcome::failure("Install failed", "   \n");
        assert_eq!(o.detail, None);
        assert_eq!(o.to_string(), "❌ Install failed");
    }

    #[test]
    fn timeout_error_maps_to_timed_out() {
        let o: Outcome = AgentError::Timeout { operation: "install".into(), secs: 300 }.into();
        assert_eq!(o.status, OutcomeStatus::TimedOut);
        assert!(o.to_string().contains("300s"));
    }
}
