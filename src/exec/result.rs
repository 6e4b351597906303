//! Exec result and inspect types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::ExecId;
use super::mode::OutputMode;
use super::state::ExecState;
use crate::stream::{DemuxedOutput, DemuxedStream, OutputStream};
use crate::transport::BoxedChannel;

/// Output of a started exec, one variant per [`OutputMode`].
pub enum ExecResult {
    /// Started without attaching.
    Detached,
    /// Raw duplex channel. The caller owns it and must close it.
    Socket(BoxedChannel),
    /// Progressive combined text.
    Stream(OutputStream),
    /// Progressive stdout/stderr chunks.
    StreamDemuxed(DemuxedStream),
    /// All output, combined.
    Complete(String),
    /// All output, stdout and stderr apart.
    CompleteDemuxed(DemuxedOutput),
}

impl ExecResult {
    /// The mode this result was produced for.
    pub fn mode(&self) -> OutputMode {
        match self {
            ExecResult::Detached => OutputMode::Detached,
            ExecResult::Socket(_) => OutputMode::Socket,
            ExecResult::Stream(_) => OutputMode::Stream,
            ExecResult::StreamDemuxed(_) => OutputMode::StreamDemuxed,
            ExecResult::Complete(_) => OutputMode::Complete,
            ExecResult::CompleteDemuxed(_) => OutputMode::CompleteDemuxed,
        }
    }

    /// Buffered combined text, if this is a `Complete` result.
    pub fn into_complete(self) -> Option<String> {
        match self {
            ExecResult::Complete(text) => Some(text),
            _ => None,
        }
    }

    /// Buffered demuxed output, if this is a `CompleteDemuxed` result.
    pub fn into_complete_demuxed(self) -> Option<DemuxedOutput> {
        match self {
            ExecResult::CompleteDemuxed(output) => Some(output),
            _ => None,
        }
    }
}

impl fmt::Debug for ExecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecResult::Detached => f.write_str("Detached"),
            ExecResult::Socket(_) => f.write_str("Socket(..)"),
            ExecResult::Stream(_) => f.write_str("Stream(..)"),
            ExecResult::StreamDemuxed(_) => f.write_str("StreamDemuxed(..)"),
            ExecResult::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            ExecResult::CompleteDemuxed(output) => {
                f.debug_tuple("CompleteDemuxed").field(output).finish()
            }
        }
    }
}

/// Process settings recorded on an exec instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Program.
    pub entrypoint: String,
    /// Arguments after the program.
    pub arguments: Vec<String>,
    /// Whether a TTY was allocated.
    pub tty: bool,
    /// Whether the process runs privileged.
    pub privileged: bool,
    /// User the process runs as.
    pub user: String,
}

/// Snapshot of an exec instance as reported by inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecInspect {
    /// Exec ID.
    #[serde(rename = "ID")]
    pub id: ExecId,
    /// Container the exec belongs to.
    #[serde(rename = "ContainerID", default)]
    pub container_id: String,
    /// Whether the process is running.
    #[serde(default)]
    pub running: bool,
    /// Exit code; `None` until the process has exited.
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// Host PID of the process, once started.
    #[serde(default)]
    pub pid: Option<u32>,
    /// Whether stdin is attached.
    #[serde(default)]
    pub open_stdin: bool,
    /// Whether stdout is attached.
    #[serde(default)]
    pub open_stdout: bool,
    /// Whether stderr is attached.
    #[serde(default)]
    pub open_stderr: bool,
    /// Whether the exec can be removed.
    #[serde(default)]
    pub can_remove: bool,
    /// Process settings.
    #[serde(default)]
    pub process_config: ProcessConfig,
}

impl ExecInspect {
    /// Lifecycle state derived from this snapshot.
    pub fn state(&self) -> ExecState {
        ExecState::from_parts(self.running, self.exit_code)
    }

    /// Exit code, once exited.
    pub fn exit_code(&self) -> Option<i64> {
        self.state().exit_code()
    }

    /// Check if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }
}
