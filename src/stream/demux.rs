//! Frame demultiplexer.
//!
//! Turns a raw exec byte channel into an ordered sequence of
//! [`StreamFrame`]s. In framed mode every chunk is preceded by an 8-byte
//! header; in TTY mode bytes are passed through untouched as stdout.

use std::io::ErrorKind;

use futures_util::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

use super::frame::{FrameHeader, StreamFrame, StreamType, HEADER_LEN};

/// Why a demultiplexed sequence ended.
///
/// None of these are surfaced to consumers as errors: the remote closing
/// the connection after the process exits is the normal way a sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Channel closed on a frame boundary.
    Eof,
    /// Channel closed in the middle of a header or payload.
    Truncated,
    /// Header carried an unknown stream type byte.
    Malformed(u8),
    /// Read failed with an I/O error.
    Io(ErrorKind),
}

impl StreamEnd {
    /// True when the channel closed cleanly.
    pub fn is_clean(&self) -> bool {
        matches!(self, StreamEnd::Eof)
    }
}

/// Decodes exec output frames from an async byte channel.
///
/// The demultiplexer is single-pass: once the sequence ends every further
/// call to [`next_frame`](Self::next_frame) returns `None`.
pub struct FrameDemultiplexer<R> {
    reader: R,
    tty: bool,
    buffer_size: usize,
    end: Option<StreamEnd>,
}

impl<R: AsyncRead + Unpin> FrameDemultiplexer<R> {
    /// Create a demultiplexer.
    ///
    /// # Arguments
    ///
    /// * `reader` - The exec output channel.
    /// * `tty` - Whether the exec was started with a TTY (no framing).
    /// * `buffer_size` - Read size for TTY bursts and payload reads.
    pub fn new(reader: R, tty: bool, buffer_size: usize) -> Self {
        Self {
            reader,
            tty,
            buffer_size: buffer_size.max(1),
            end: None,
        }
    }

    /// Demultiplexer for framed (non-TTY) output.
    pub fn framed(reader: R, buffer_size: usize) -> Self {
        Self::new(reader, false, buffer_size)
    }

    /// Pass-through reader for TTY output.
    pub fn raw(reader: R, buffer_size: usize) -> Self {
        Self::new(reader, true, buffer_size)
    }

    /// Whether this demultiplexer runs in TTY pass-through mode.
    pub fn is_tty(&self) -> bool {
        self.tty
    }

    /// Why the sequence ended, or `None` if it has not ended yet.
    pub fn end_reason(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Read the next stdout/stderr frame.
    ///
    /// Returns `None` once the channel is exhausted or a read fails.
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        if self.end.is_some() {
            return None;
        }

        let result = if self.tty {
            self.read_raw().await
        } else {
            self.read_framed().await
        };

        match result {
            Ok(frame) => Some(frame),
            Err(end) => {
                self.finish(end);
                None
            }
        }
    }

    /// Convert into a stream of frames, consuming the demultiplexer.
    pub fn into_stream(self) -> impl Stream<Item = StreamFrame> {
        stream::unfold(self, |mut demux| async move {
            demux.next_frame().await.map(|frame| (frame, demux))
        })
    }

    async fn read_raw(&mut self) -> Result<StreamFrame, StreamEnd> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = loop {
            match self.reader.read(&mut buf).await {
                Ok(0) => return Err(StreamEnd::Eof),
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamEnd::Io(e.kind())),
            }
        };
        buf.truncate(n);
        trace!("demux: raw burst of {} bytes", n);
        Ok(StreamFrame::stdout(buf))
    }

    async fn read_framed(&mut self) -> Result<StreamFrame, StreamEnd> {
        loop {
            let mut header = [0u8; HEADER_LEN];
            match fill(&mut self.reader, &mut header).await {
                Ok(0) => return Err(StreamEnd::Eof),
                Ok(n) if n < HEADER_LEN => return Err(StreamEnd::Truncated),
                Ok(_) => {}
                Err(e) => return Err(StreamEnd::Io(e.kind())),
            }

            let header = FrameHeader::decode(&header);
            let stream = header
                .stream()
                .ok_or(StreamEnd::Malformed(header.stream_byte))?;
            let payload = self.read_payload(header.length as usize).await?;

            trace!("demux: {:?} frame of {} bytes", stream, payload.len());
            if stream == StreamType::Stdin {
                continue;
            }
            return Ok(StreamFrame::new(stream, payload));
        }
    }

    /// Read exactly `length` bytes, growing the buffer as data arrives
    /// rather than trusting the advertised length up front.
    async fn read_payload(&mut self, length: usize) -> Result<Vec<u8>, StreamEnd> {
        let mut payload = Vec::with_capacity(length.min(self.buffer_size));
        let mut chunk = vec![0u8; self.buffer_size.min(length.max(1))];

        while payload.len() < length {
            let want = (length - payload.len()).min(chunk.len());
            match self.reader.read(&mut chunk[..want]).await {
                Ok(0) => return Err(StreamEnd::Truncated),
                Ok(n) => payload.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamEnd::Io(e.kind())),
            }
        }
        Ok(payload)
    }

    fn finish(&mut self, end: StreamEnd) {
        if end.is_clean() {
            debug!("demux: channel closed");
        } else {
            warn!("demux: stream ended abnormally: {:?}", end);
        }
        self.end = Some(end);
    }
}

/// Fill `buf` from the reader, stopping early only at end of input.
///
/// Returns the number of bytes read.
async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
