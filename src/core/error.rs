//! # Core Error Module
//!
//! This module defines the central `AgentError` type used throughout the agent.
//! It leverages `thiserror` for error message formatting and `serde` for serialization,
//! so an error can be attached to a structured log entry as-is.

use serde::Serialize;
use thiserror::Error;

/// Central error type for the `security_agent` crate.
#[derive(Debug, Error, Serialize)]
pub enum AgentError {
    /// Error related to configuration loading, merging or validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error related to internal logic or state.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// HTTP request or network failure (connection refused, DNS, TLS, timeout).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Filesystem failure while reading a source or writing a batch artifact.
    #[error("I/O error on {path}: {details}")]
    IoError {
        /// The file or directory involved.
        path: String,
        /// The underlying OS error text.
        details: String,
    },

    /// A record could not be decoded.
    #[error("Parse error: {details}")]
    ParseError {
        /// Description of what could not be parsed.
        details: String,
    },

    /// An external program could not be spawned or exited unsuccessfully.
    #[error("Process error in {program}: {details}")]
    ProcessError {
        /// The program that was invoked.
        program: String,
        /// Captured error stream or spawn failure text.
        details: String,
    },

    /// An operation exceeded its time budget.
    #[error("Timeout after {secs}s: {operation}")]
    Timeout {
        /// Human-readable name of the operation.
        operation: String,
        /// The budget that was exceeded.
        secs: u64,
    },

    /// The temporary elevation grant could not be set up.
    #[error("Privilege error: {0}")]
    PrivilegeError(String),
}

impl AgentError {
    /// Builds an [`AgentError::IoError`] from a path and an `std::io::Error`.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        AgentError::IoError {
            path: path.as_ref().display().to_string(),
            details: err.to_string(),
        }
    }
}
