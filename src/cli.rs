//! Command-line interface for exec-demux.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::exec::ExecStartOptions;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Captured stream to decode; stdin when absent or `-`.
    pub input: Option<PathBuf>,
    /// Input was produced with a TTY (no frame headers).
    pub tty: bool,
    /// Write stdout and stderr frames to separate streams.
    pub demux: bool,
    /// Write output as it is decoded instead of at the end.
    pub stream: bool,
    /// Read buffer size (overrides config file).
    pub buffer_size: Option<usize>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// Start options equivalent to the output flags.
    ///
    /// Fails for flag combinations the exec API rejects (e.g. `--tty --demux`).
    pub fn start_options(&self) -> crate::Result<ExecStartOptions> {
        ExecStartOptions::builder()
            .tty(self.tty)
            .stream(self.stream)
            .demux(self.demux)
            .build()
    }

    /// Whether input should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        match &self.input {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('t') | Long("tty") => {
                result.tty = true;
            }
            Short('d') | Long("demux") => {
                result.demux = true;
            }
            Short('s') | Long("stream") => {
                result.stream = true;
            }
            Short('b') | Long("buffer-size") => {
                let value: String = parser.value()?.parse()?;
                let size: usize = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("buffer-size", value.clone()))?;
                if size == 0 {
                    return Err(ArgsError::InvalidValue("buffer-size", value));
                }
                result.buffer_size = Some(size);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) if result.input.is_none() => {
                result.input = Some(PathBuf::from(val));
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"exec-demux {version}
Decode a captured container exec/attach output stream

USAGE:
    exec-demux [OPTIONS] [FILE]

ARGS:
    [FILE]                    Captured stream to decode; reads stdin if omitted or '-'

OPTIONS:
    -t, --tty                 Input is raw TTY output (no frame headers)
    -d, --demux               Write stdout frames to stdout and stderr frames to stderr
    -s, --stream              Write output as it is decoded
    -b, --buffer-size <BYTES> Read buffer size [default: 8192]
    -c, --config <FILE>       Path to configuration file (JSON)
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    CONTAINER_EXEC_BUFFER_SIZE       Read buffer size (overrides config)
    CONTAINER_EXEC_CHANNEL_CAPACITY  Chunks buffered in --stream mode (overrides config)
    CONTAINER_EXEC_LOG_LEVEL         Log level (overrides config)
    RUST_LOG                         Alternative log level setting

EXAMPLES:
    # Split a captured non-TTY exec stream
    exec-demux --demux capture.bin

    # Follow a live stream from a pipe
    curl --unix-socket /var/run/docker.sock ... | exec-demux --stream
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("exec-demux {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
