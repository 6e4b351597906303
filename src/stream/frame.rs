//! Multiplexed stream framing.
//!
//! Non-TTY exec and attach output is sent as a sequence of frames, each
//! prefixed by an 8-byte header:
//!
//! ```text
//! +--------+-----------+---------------------------+
//! | type:1 | reserved:3| length:4 (big-endian u32) |
//! +--------+-----------+---------------------------+
//! ```
//!
//! followed by exactly `length` payload bytes.

/// Size of a frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest payload a single frame can describe.
const MAX_FRAME_LEN: usize = u32::MAX as usize;

/// Logical channel a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Echoed standard input. Never surfaced to consumers.
    Stdin,
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StreamType {
    /// Parse the stream type byte. Returns `None` for unknown values.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Stdin),
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }

    /// Wire value of this stream type.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Stdin => 0,
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }
}

/// A decoded frame of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Which channel the payload came from (stdout or stderr).
    pub stream: StreamType,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl StreamFrame {
    /// Create a new frame.
    pub fn new(stream: StreamType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            stream,
            payload: payload.into(),
        }
    }

    /// Create a stdout frame.
    pub fn stdout(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(StreamType::Stdout, payload)
    }

    /// Create a stderr frame.
    pub fn stderr(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(StreamType::Stderr, payload)
    }

    /// Payload decoded as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Parsed 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw stream type byte as received.
    pub stream_byte: u8,
    /// Payload length.
    pub length: u32,
}

impl FrameHeader {
    /// Create a header for the given stream and payload length.
    pub fn new(stream: StreamType, length: u32) -> Self {
        Self {
            stream_byte: stream.as_byte(),
            length,
        }
    }

    /// Decode a header. Reserved bytes are ignored.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            stream_byte: bytes[0],
            length: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Encode this header to its wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let len = self.length.to_be_bytes();
        [self.stream_byte, 0, 0, 0, len[0], len[1], len[2], len[3]]
    }

    /// Stream type, if the type byte is known.
    pub fn stream(&self) -> Option<StreamType> {
        StreamType::from_byte(self.stream_byte)
    }
}

/// Encode a complete frame (header followed by payload).
///
/// Payloads longer than `u32::MAX` bytes are split across several frames.
pub fn encode_frame(stream: StreamType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    if payload.is_empty() {
        out.extend_from_slice(&FrameHeader::new(stream, 0).encode());
        return out;
    }
    for chunk in payload.chunks(MAX_FRAME_LEN) {
        // chunks() bounds the length to MAX_FRAME_LEN
        let length = chunk.len() as u32;
        out.extend_from_slice(&FrameHeader::new(stream, length).encode());
        out.extend_from_slice(chunk);
    }
    out
}
