//! Output text handling.
//!
//! Exec output arrives as raw bytes; this module turns it into text without
//! corrupting characters that straddle chunk boundaries.
//!
//! # Example
//!
//! ```
//! use container_exec::output::TextDecoder;
//!
//! let mut decoder = TextDecoder::new();
//! let mut text = decoder.decode(b"na\xC3");
//! text.push_str(&decoder.decode(b"\xAFve"));
//! assert_eq!(text, "na\u{ef}ve");
//! ```

mod decoder;

pub use decoder::TextDecoder;
