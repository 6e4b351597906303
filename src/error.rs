//! Error types for container-exec.

use std::time::Duration;

use thiserror::Error;

/// Main error type for exec operations.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The target container does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The target container exists but is not running (or is paused).
    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    /// Exec instance with the given ID was not found.
    #[error("exec instance not found: {0}")]
    ExecNotFound(String),

    /// Incompatible option combination, rejected before any network call.
    #[error("invalid exec options: {0}")]
    InvalidOptions(String),

    /// Exec ID could not be parsed.
    #[error("invalid exec id: {0:?}")]
    InvalidExecId(String),

    /// Connection failure while opening or starting an exec.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote failure with no domain-specific mapping.
    #[error("remote error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The process did not exit within the allotted time.
    #[error("timed out after {timeout:?} waiting for exec {exec_id}")]
    Timeout { exec_id: String, timeout: Duration },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContainerNotFound(_) | Self::ExecNotFound(_))
    }
}

/// Convenience Result type for exec operations.
pub type Result<T> = std::result::Result<T, ExecError>;
