//! Transport seam for exec operations.
//!
//! The HTTP or Unix-socket plumbing that talks to the engine lives outside
//! this crate. It is plugged in through [`ExecTransport`], which reports
//! remote failures as raw [`TransportError`]s; [`ExecClient`] maps those to
//! domain errors.
//!
//! [`ExecClient`]: crate::exec::ExecClient

mod lease;

pub use lease::ChannelLease;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::exec::{ConsoleSize, ExecConfig, ExecId, ExecInspect, ExecStartOptions};

/// HTTP status the engine uses for unknown containers and exec instances.
pub const STATUS_NOT_FOUND: u16 = 404;

/// HTTP status the engine uses when the container is not running.
pub const STATUS_CONFLICT: u16 = 409;

/// A raw duplex byte channel to a started exec.
pub trait DuplexChannel: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized> DuplexChannel for T {}

/// Owned, type-erased duplex channel.
pub type BoxedChannel = Box<dyn DuplexChannel>;

/// Failure reported by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote answered with a non-success status.
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The connection could not be established or broke during the call.
    #[error("connection failed: {0}")]
    Connection(#[from] std::io::Error),
}

impl TransportError {
    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a 404 status error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(STATUS_NOT_FOUND, message)
    }

    /// Create a 409 status error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::status(STATUS_CONFLICT, message)
    }

    /// Status code, if the remote answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Connection(_) => None,
        }
    }
}

/// Request/response and upgrade operations against the engine's exec API.
///
/// Implementations perform no retries; exec is not idempotent.
#[async_trait]
pub trait ExecTransport: Send + Sync {
    /// Create an exec instance in a container.
    async fn create_exec(
        &self,
        container_id: &str,
        config: &ExecConfig,
    ) -> Result<ExecId, TransportError>;

    /// Fetch the current snapshot of an exec instance.
    async fn inspect_exec(&self, exec_id: &ExecId) -> Result<ExecInspect, TransportError>;

    /// Start an exec without attaching to its output.
    async fn start_detached(
        &self,
        exec_id: &ExecId,
        options: &ExecStartOptions,
    ) -> Result<(), TransportError>;

    /// Start an exec and return the upgraded duplex channel.
    async fn open(
        &self,
        exec_id: &ExecId,
        options: &ExecStartOptions,
    ) -> Result<BoxedChannel, TransportError>;

    /// Resize the TTY of a running exec.
    async fn resize_exec(&self, exec_id: &ExecId, size: ConsoleSize)
        -> Result<(), TransportError>;
}
