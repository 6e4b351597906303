//! Exec instance client.

use std::time::Duration;

use tracing::{debug, warn};

use super::id::ExecId;
use super::mode::OutputMode;
use super::options::{ConsoleSize, ExecConfig, ExecStartOptions};
use super::result::{ExecInspect, ExecResult};
use super::state::ExecState;
use crate::error::ExecError;
use crate::stream::{
    collect_all, collect_demuxed, DemuxedStream, FrameDemultiplexer, OutputStream, StreamConfig,
};
use crate::transport::{
    ChannelLease, ExecTransport, TransportError, STATUS_CONFLICT, STATUS_NOT_FOUND,
};
use crate::Result;

/// Interval between inspect calls in [`ExecClient::wait`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Creates, starts, inspects and resizes exec instances.
///
/// No call is retried: running a command is not idempotent, so retry
/// decisions are left to the caller.
pub struct ExecClient<T> {
    transport: T,
    stream_config: StreamConfig,
}

impl<T: ExecTransport> ExecClient<T> {
    /// Create a new client over the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stream_config: StreamConfig::default(),
        }
    }

    /// Set the stream decoding parameters.
    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current stream decoding parameters.
    pub fn stream_config(&self) -> StreamConfig {
        self.stream_config
    }

    /// Create an exec instance in a running container.
    pub async fn create(&self, container_id: &str, config: &ExecConfig) -> Result<ExecId> {
        config.validate()?;

        let exec_id = self
            .transport
            .create_exec(container_id, config)
            .await
            .map_err(|e| container_error(container_id, e))?;

        debug!("exec {} created in container {}", exec_id.short(), container_id);
        Ok(exec_id)
    }

    /// Fetch the current snapshot of an exec instance.
    pub async fn inspect(&self, exec_id: &ExecId) -> Result<ExecInspect> {
        self.transport
            .inspect_exec(exec_id)
            .await
            .map_err(|e| exec_error(exec_id, e))
    }

    /// Start an exec instance and deliver its output in the mode the
    /// options select.
    pub async fn start(&self, exec_id: &ExecId, options: ExecStartOptions) -> Result<ExecResult> {
        let mode = options.mode();
        debug!("exec {}: starting in {:?} mode", exec_id.short(), mode);

        match mode {
            OutputMode::Detached => {
                self.transport
                    .start_detached(exec_id, &options)
                    .await
                    .map_err(|e| exec_error(exec_id, e))?;
                Ok(ExecResult::Detached)
            }
            OutputMode::Socket => {
                let lease = self.open(exec_id, &options).await?;
                let channel = lease
                    .into_socket()
                    .ok_or_else(|| ExecError::Transport("exec channel already closed".into()))?;
                Ok(ExecResult::Socket(channel))
            }
            OutputMode::Stream => {
                let demux = self.demultiplexer(self.open(exec_id, &options).await?, &options);
                Ok(ExecResult::Stream(OutputStream::spawn(
                    demux,
                    self.stream_config.channel_capacity,
                )))
            }
            OutputMode::StreamDemuxed => {
                let demux = self.demultiplexer(self.open(exec_id, &options).await?, &options);
                Ok(ExecResult::StreamDemuxed(DemuxedStream::spawn(
                    demux,
                    self.stream_config.channel_capacity,
                )))
            }
            OutputMode::Complete => {
                let demux = self.demultiplexer(self.open(exec_id, &options).await?, &options);
                Ok(ExecResult::Complete(collect_all(demux).await))
            }
            OutputMode::CompleteDemuxed => {
                let demux = self.demultiplexer(self.open(exec_id, &options).await?, &options);
                Ok(ExecResult::CompleteDemuxed(collect_demuxed(demux).await))
            }
        }
    }

    /// Create an exec instance and start it.
    pub async fn run(
        &self,
        container_id: &str,
        config: &ExecConfig,
        options: ExecStartOptions,
    ) -> Result<ExecResult> {
        let exec_id = self.create(container_id, config).await?;
        self.start(&exec_id, options).await
    }

    /// Resize the TTY of an exec instance.
    ///
    /// Only meaningful when a TTY was requested at both create and start;
    /// the engine enforces that.
    pub async fn resize(&self, exec_id: &ExecId, size: ConsoleSize) -> Result<()> {
        if size.is_empty() {
            return Err(ExecError::InvalidOptions(format!(
                "console size must be non-zero, got {}x{}",
                size.rows, size.cols
            )));
        }

        self.transport
            .resize_exec(exec_id, size)
            .await
            .map_err(|e| exec_error(exec_id, e))
    }

    /// Wait for the process to exit and return its exit code.
    ///
    /// Polls inspect every [`DEFAULT_POLL_INTERVAL`]. Fails with
    /// [`ExecError::Timeout`] if the process has not exited within `timeout`,
    /// which includes an exec that was created but never started.
    pub async fn wait(&self, exec_id: &ExecId, timeout: Duration) -> Result<i64> {
        self.wait_with_interval(exec_id, DEFAULT_POLL_INTERVAL, timeout)
            .await
    }

    /// Like [`wait`](Self::wait), with an explicit polling interval.
    pub async fn wait_with_interval(
        &self,
        exec_id: &ExecId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<i64> {
        match tokio::time::timeout(timeout, self.poll_until_exit(exec_id, poll_interval)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "exec {}: still not exited after {:?}",
                    exec_id.short(),
                    timeout
                );
                Err(ExecError::Timeout {
                    exec_id: exec_id.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn poll_until_exit(&self, exec_id: &ExecId, poll_interval: Duration) -> Result<i64> {
        let mut last = ExecState::Created;
        loop {
            let state = self.inspect(exec_id).await?.state();
            if !last.can_transition_to(state) {
                warn!(
                    "exec {}: unexpected state change {:?} -> {:?}",
                    exec_id.short(),
                    last,
                    state
                );
            }
            if let ExecState::Exited(code) = state {
                debug!("exec {} exited with code {}", exec_id.short(), code);
                return Ok(code);
            }
            last = state;
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn open(&self, exec_id: &ExecId, options: &ExecStartOptions) -> Result<ChannelLease> {
        let channel = self
            .transport
            .open(exec_id, options)
            .await
            .map_err(|e| exec_error(exec_id, e))?;
        Ok(ChannelLease::new(exec_id.clone(), channel))
    }

    fn demultiplexer(
        &self,
        lease: ChannelLease,
        options: &ExecStartOptions,
    ) -> FrameDemultiplexer<ChannelLease> {
        FrameDemultiplexer::new(lease, options.tty(), self.stream_config.buffer_size)
    }
}

/// Map a failure of a container-scoped call.
fn container_error(container_id: &str, err: TransportError) -> ExecError {
    match err.status_code() {
        Some(STATUS_NOT_FOUND) => ExecError::ContainerNotFound(container_id.to_string()),
        Some(STATUS_CONFLICT) => ExecError::ContainerNotRunning(container_id.to_string()),
        _ => transport_error(err),
    }
}

/// Map a failure of an exec-scoped call.
fn exec_error(exec_id: &ExecId, err: TransportError) -> ExecError {
    match err.status_code() {
        Some(STATUS_NOT_FOUND) => ExecError::ExecNotFound(exec_id.to_string()),
        Some(STATUS_CONFLICT) => ExecError::ContainerNotRunning(exec_id.to_string()),
        _ => transport_error(err),
    }
}

fn transport_error(err: TransportError) -> ExecError {
    match err {
        TransportError::Status { status, message } => ExecError::Api { status, message },
        TransportError::Connection(e) => ExecError::Transport(e.to_string()),
    }
}
