//! # container-exec
//!
//! Run commands inside running containers and consume their output.
//!
//! This crate implements the client side of the container engine exec API:
//! choosing how output is delivered from the start options, and decoding the
//! multiplexed stdout/stderr byte stream the engine sends back. The HTTP or
//! Unix-socket plumbing is supplied by the caller through
//! [`ExecTransport`](transport::ExecTransport).
//!
//! ## Features
//!
//! - **Six output modes**: detached, raw socket, progressive or buffered,
//!   with or without stdout/stderr separation
//! - **Frame demultiplexing**: 8-byte stream headers decoded incrementally,
//!   TTY output passed through untouched
//! - **Async I/O**: cooperative decoding on tokio with bounded hand-off
//! - **Exactly-once release**: the exec channel is closed on every exit path
//!
//! ## Quick Start
//!
//! ```
//! use container_exec::stream::{encode_frame, FrameDemultiplexer, OutputStream, StreamType};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     container_exec::logging::try_init().ok();
//!
//!     let mut wire = encode_frame(StreamType::Stdout, b"line1\n");
//!     wire.extend(encode_frame(StreamType::Stdout, b"line2\n"));
//!
//!     let demux = FrameDemultiplexer::framed(std::io::Cursor::new(wire), 4096);
//!     let text = OutputStream::spawn(demux, 8).collect_text().await;
//!     assert_eq!(text, "line1\nline2\n");
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod output;
pub mod stream;
pub mod transport;

// Re-export commonly used types
pub use error::{ExecError, Result};
pub use exec::{
    ConsoleSize, ExecClient, ExecConfig, ExecId, ExecInspect, ExecResult, ExecStartOptions,
    ExecState, OutputMode,
};
pub use stream::{DemuxedOutput, DemuxedStream, OutputStream, StreamConfig, StreamFrame, StreamType};
pub use transport::{BoxedChannel, ChannelLease, ExecTransport, TransportError};
