//! Exec create and start options.

use serde::{Serialize, Serializer};

use super::mode::OutputMode;
use crate::error::ExecError;
use crate::Result;

/// TTY geometry in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl ConsoleSize {
    /// Create a new ConsoleSize with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// True if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl Default for ConsoleSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

/// Sent as `[height, width]`.
impl Serialize for ConsoleSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        [self.rows, self.cols].serialize(serializer)
    }
}

/// Body of an exec create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecConfig {
    /// Attach to the process's stdin.
    pub attach_stdin: bool,
    /// Attach to the process's stdout.
    pub attach_stdout: bool,
    /// Attach to the process's stderr.
    pub attach_stderr: bool,
    /// Allocate a pseudo-terminal.
    pub tty: bool,
    /// Key sequence for detaching from the exec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detach_keys: Option<String>,
    /// Environment variables as `KEY=value`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    /// Command and arguments.
    pub cmd: Vec<String>,
    /// Run with extended privileges.
    pub privileged: bool,
    /// User to run as (`user`, `user:group`, `uid`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Working directory inside the container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Initial TTY size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_size: Option<ConsoleSize>,
}

impl ExecConfig {
    /// Create a config running the given argv, with stdout and stderr
    /// attached.
    pub fn new<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attach_stdin: false,
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
            detach_keys: None,
            env: Vec::new(),
            cmd: cmd.into_iter().map(Into::into).collect(),
            privileged: false,
            user: None,
            working_dir: None,
            console_size: None,
        }
    }

    /// Run a command line through `sh -c`.
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self::new(["sh".to_string(), "-c".to_string(), command_line.into()])
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.cmd.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env.push(format!("{}={}", key.as_ref(), value.as_ref()));
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set whether to run privileged.
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Set whether to allocate a TTY.
    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Set whether to attach stdin.
    pub fn attach_stdin(mut self, attach: bool) -> Self {
        self.attach_stdin = attach;
        self
    }

    /// Set whether to attach stdout.
    pub fn attach_stdout(mut self, attach: bool) -> Self {
        self.attach_stdout = attach;
        self
    }

    /// Set whether to attach stderr.
    pub fn attach_stderr(mut self, attach: bool) -> Self {
        self.attach_stderr = attach;
        self
    }

    /// Set the detach key sequence.
    pub fn detach_keys(mut self, keys: impl Into<String>) -> Self {
        self.detach_keys = Some(keys.into());
        self
    }

    /// Set the initial TTY size.
    pub fn console_size(mut self, size: ConsoleSize) -> Self {
        self.console_size = Some(size);
        self
    }

    /// Check the config before sending it.
    pub fn validate(&self) -> Result<()> {
        if self.cmd.is_empty() {
            return Err(ExecError::InvalidOptions("command must not be empty".into()));
        }
        if self.console_size.is_some() && !self.tty {
            return Err(ExecError::InvalidOptions("console size requires tty".into()));
        }
        Ok(())
    }
}

/// Options for starting an exec instance.
///
/// `detach` and `tty` (and the console size) are sent to the engine; the
/// `stream`, `socket` and `demux` flags only select how output is delivered
/// to the caller. Invalid combinations are rejected at construction, before
/// any network call:
/// - `stream` and `socket` are mutually exclusive
/// - `demux` requires `tty` to be off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecStartOptions {
    detach: bool,
    tty: bool,
    #[serde(skip)]
    stream: bool,
    #[serde(skip)]
    socket: bool,
    #[serde(skip)]
    demux: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    console_size: Option<ConsoleSize>,
}

impl ExecStartOptions {
    /// Create options from the five flags.
    pub fn new(detach: bool, tty: bool, stream: bool, socket: bool, demux: bool) -> Result<Self> {
        ExecStartOptionsBuilder {
            detach,
            tty,
            stream,
            socket,
            demux,
            console_size: None,
        }
        .build()
    }

    /// Start building options.
    pub fn builder() -> ExecStartOptionsBuilder {
        ExecStartOptionsBuilder::default()
    }

    /// Start without attaching to output.
    pub fn detach(&self) -> bool {
        self.detach
    }

    /// Exec runs with a TTY (output is not framed).
    pub fn tty(&self) -> bool {
        self.tty
    }

    /// Deliver output progressively.
    pub fn stream(&self) -> bool {
        self.stream
    }

    /// Hand the raw channel to the caller.
    pub fn socket(&self) -> bool {
        self.socket
    }

    /// Keep stdout and stderr apart.
    pub fn demux(&self) -> bool {
        self.demux
    }

    /// Initial TTY size.
    pub fn console_size(&self) -> Option<ConsoleSize> {
        self.console_size
    }

    /// The output mode these options select.
    pub fn mode(&self) -> OutputMode {
        OutputMode::negotiate(self)
    }
}

/// Builder for [`ExecStartOptions`].
#[derive(Debug, Clone, Default)]
pub struct ExecStartOptionsBuilder {
    detach: bool,
    tty: bool,
    stream: bool,
    socket: bool,
    demux: bool,
    console_size: Option<ConsoleSize>,
}

impl ExecStartOptionsBuilder {
    /// Create a new builder with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set detach.
    pub fn detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    /// Set tty.
    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Set stream.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set socket.
    pub fn socket(mut self, socket: bool) -> Self {
        self.socket = socket;
        self
    }

    /// Set demux.
    pub fn demux(mut self, demux: bool) -> Self {
        self.demux = demux;
        self
    }

    /// Set the initial TTY size.
    pub fn console_size(mut self, size: ConsoleSize) -> Self {
        self.console_size = Some(size);
        self
    }

    /// Validate and build the options.
    pub fn build(self) -> Result<ExecStartOptions> {
        if self.stream && self.socket {
            return Err(ExecError::InvalidOptions(
                "stream and socket are mutually exclusive".into(),
            ));
        }
        if self.demux && self.tty {
            return Err(ExecError::InvalidOptions(
                "demux requires tty to be disabled".into(),
            ));
        }
        if self.console_size.is_some() && !self.tty {
            return Err(ExecError::InvalidOptions("console size requires tty".into()));
        }
        Ok(ExecStartOptions {
            detach: self.detach,
            tty: self.tty,
            stream: self.stream,
            socket: self.socket,
            demux: self.demux,
            console_size: self.console_size,
        })
    }
}
