//! Exec output stream decoding.
//!
//! This module decodes the byte stream returned by an exec start:
//! - Frame header parsing for multiplexed stdout/stderr
//! - TTY pass-through
//! - One-shot and progressive consumption
//!
//! # Example
//!
//! ```
//! use container_exec::stream::{collect_demuxed, encode_frame, FrameDemultiplexer, StreamType};
//!
//! # tokio_test::block_on(async {
//! let mut wire = encode_frame(StreamType::Stdout, b"out\n");
//! wire.extend(encode_frame(StreamType::Stderr, b"err\n"));
//!
//! let demux = FrameDemultiplexer::framed(std::io::Cursor::new(wire), 4096);
//! let output = collect_demuxed(demux).await;
//! assert_eq!(output.stdout, "out\n");
//! assert_eq!(output.stderr, "err\n");
//! # });
//! ```

mod adapter;
mod demux;
mod frame;

pub use adapter::{collect_all, collect_demuxed, DemuxedOutput, DemuxedStream, OutputStream};
pub use demux::{FrameDemultiplexer, StreamEnd};
pub use frame::{encode_frame, FrameHeader, StreamFrame, StreamType, HEADER_LEN};

/// Default read size for payloads and TTY bursts.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default number of chunks buffered between decoder and consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Tuning for stream decoding, passed explicitly to each session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Read size for payloads and TTY bursts.
    pub buffer_size: usize,
    /// Bounded hand-off capacity for progressive output.
    pub channel_capacity: usize,
}

impl StreamConfig {
    /// Create a new StreamConfig.
    pub fn new(buffer_size: usize, channel_capacity: usize) -> Self {
        Self {
            buffer_size,
            channel_capacity,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
