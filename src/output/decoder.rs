//! Incremental UTF-8 decoding of output chunks.
//!
//! Frames and TTY bursts are cut at arbitrary byte offsets, so a multi-byte
//! character can straddle two chunks. `String::from_utf8_lossy` on each chunk
//! would turn both halves into U+FFFD; this decoder holds back the incomplete
//! tail and prepends it to the next chunk instead.

/// Decodes a byte stream into text, one chunk at a time.
#[derive(Debug, Default)]
pub struct TextDecoder {
    pending: Vec<u8>,
}

impl TextDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    ///
    /// Invalid sequences are replaced with U+FFFD. A trailing incomplete
    /// sequence is buffered until the next call or [`finish`](Self::finish).
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let data: Vec<u8> = if self.pending.is_empty() {
            bytes.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            joined
        };

        let mut out = String::with_capacity(data.len());
        let mut rest = data.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush any buffered bytes. An incomplete tail becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Whether bytes are being held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
