//! Output mode negotiation.

use super::options::ExecStartOptions;

/// How the output of a started exec is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// No output is consumed.
    Detached,
    /// The raw duplex channel is handed to the caller.
    Socket,
    /// Progressive combined text.
    Stream,
    /// Progressive text tagged stdout/stderr.
    StreamDemuxed,
    /// Fully buffered combined text.
    Complete,
    /// Fully buffered stdout and stderr.
    CompleteDemuxed,
}

impl OutputMode {
    /// Pick the mode for validated options.
    ///
    /// Precedence: detach, then socket, then stream; `demux` selects the
    /// demultiplexed variant of streamed or buffered output.
    pub fn negotiate(options: &ExecStartOptions) -> Self {
        match (
            options.detach(),
            options.socket(),
            options.stream(),
            options.demux(),
        ) {
            (true, _, _, _) => OutputMode::Detached,
            (false, true, _, _) => OutputMode::Socket,
            (false, false, true, true) => OutputMode::StreamDemuxed,
            (false, false, true, false) => OutputMode::Stream,
            (false, false, false, true) => OutputMode::CompleteDemuxed,
            (false, false, false, false) => OutputMode::Complete,
        }
    }

    /// Whether a duplex channel is opened for this mode.
    pub fn opens_channel(&self) -> bool {
        !matches!(self, OutputMode::Detached)
    }

    /// Whether output is delivered progressively.
    pub fn is_progressive(&self) -> bool {
        matches!(self, OutputMode::Stream | OutputMode::StreamDemuxed)
    }

    /// Whether stdout and stderr are kept apart.
    pub fn is_demuxed(&self) -> bool {
        matches!(self, OutputMode::StreamDemuxed | OutputMode::CompleteDemuxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(detach: bool, tty: bool, stream: bool, socket: bool, demux: bool) -> OutputMode {
        ExecStartOptions::new(detach, tty, stream, socket, demux)
            .unwrap()
            .mode()
    }

    #[test]
    fn test_detach_wins() {
        assert_eq!(mode(true, false, true, false, true), OutputMode::Detached);
        assert_eq!(mode(true, true, false, true, false), OutputMode::Detached);
    }

    #[test]
    fn test_socket_over_demux() {
        assert_eq!(mode(false, false, false, true, true), OutputMode::Socket);
        assert_eq!(mode(false, true, false, true, false), OutputMode::Socket);
    }

    #[test]
    fn test_stream_variants() {
        assert_eq!(mode(false, true, true, false, false), OutputMode::Stream);
        assert_eq!(mode(false, false, true, false, true), OutputMode::StreamDemuxed);
    }

    #[test]
    fn test_buffered_variants() {
        assert_eq!(mode(false, false, false, false, false), OutputMode::Complete);
        assert_eq!(mode(false, true, false, false, false), OutputMode::Complete);
        assert_eq!(
            mode(false, false, false, false, true),
            OutputMode::CompleteDemuxed
        );
    }

    #[test]
    fn test_mode_properties() {
        assert!(!OutputMode::Detached.opens_channel());
        assert!(OutputMode::Socket.opens_channel());
        assert!(OutputMode::Stream.is_progressive());
        assert!(!OutputMode::Complete.is_progressive());
        assert!(OutputMode::CompleteDemuxed.is_demuxed());
        assert!(!OutputMode::Stream.is_demuxed());
    }
}
