//! Consumption APIs over a [`FrameDemultiplexer`].
//!
//! Output can be materialized in one go ([`collect_all`],
//! [`collect_demuxed`]) or pulled progressively ([`OutputStream`],
//! [`DemuxedStream`]). Progressive streams run the decode loop on a
//! dedicated task that feeds a bounded channel; dropping or cancelling the
//! stream tears that task down, which drops the demultiplexer and with it
//! the underlying channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::demux::FrameDemultiplexer;
use super::frame::StreamType;
use crate::output::TextDecoder;

/// Accumulated stdout and stderr text.
///
/// Order within each channel is preserved; interleaving between the two
/// channels is not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxedOutput {
    /// Standard output text.
    pub stdout: String,
    /// Standard error text.
    pub stderr: String,
}

impl DemuxedOutput {
    /// Create a new output pair.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Chunk carrying only stdout text.
    pub fn stdout_only(text: impl Into<String>) -> Self {
        Self::new(text, String::new())
    }

    /// Chunk carrying only stderr text.
    pub fn stderr_only(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    /// True if both channels are empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Append another chunk to this output.
    pub fn extend(&mut self, other: &DemuxedOutput) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
    }
}

/// Read the whole sequence into one text buffer, stdout and stderr combined
/// in wire order.
pub async fn collect_all<R: AsyncRead + Unpin>(mut demux: FrameDemultiplexer<R>) -> String {
    let mut raw = Vec::new();
    while let Some(frame) = demux.next_frame().await {
        raw.extend_from_slice(&frame.payload);
    }
    String::from_utf8_lossy(&raw).into_owned()
}

/// Read the whole sequence into separate stdout and stderr buffers.
pub async fn collect_demuxed<R: AsyncRead + Unpin>(
    mut demux: FrameDemultiplexer<R>,
) -> DemuxedOutput {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    while let Some(frame) = demux.next_frame().await {
        match frame.stream {
            StreamType::Stderr => stderr.extend_from_slice(&frame.payload),
            _ => stdout.extend_from_slice(&frame.payload),
        }
    }
    DemuxedOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

/// Progressive sequence of combined output text.
pub struct OutputStream {
    inner: Progressive<String>,
}

impl OutputStream {
    /// Start decoding on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(demux: FrameDemultiplexer<R>, capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            inner: Progressive::spawn(demux, capacity, Decoding::Combined, |_, text| text),
        }
    }

    /// Receive the next chunk, or `None` once the output is exhausted.
    pub async fn next_chunk(&mut self) -> Option<String> {
        self.inner.rx.recv().await
    }

    /// Concatenate all remaining chunks.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            text.push_str(&chunk);
        }
        text
    }

    /// Stop consuming. The channel has been released when this returns.
    pub async fn cancel(mut self) {
        self.inner.shutdown().await;
    }
}

impl Stream for OutputStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.rx.poll_recv(cx)
    }
}

/// Progressive sequence of output chunks tagged by channel.
///
/// Each item carries text on exactly one side.
pub struct DemuxedStream {
    inner: Progressive<DemuxedOutput>,
}

impl DemuxedStream {
    /// Start decoding on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(demux: FrameDemultiplexer<R>, capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            inner: Progressive::spawn(demux, capacity, Decoding::PerChannel, |stream, text| {
                match stream {
                    StreamType::Stderr => DemuxedOutput::stderr_only(text),
                    _ => DemuxedOutput::stdout_only(text),
                }
            }),
        }
    }

    /// Receive the next chunk, or `None` once the output is exhausted.
    pub async fn next_chunk(&mut self) -> Option<DemuxedOutput> {
        self.inner.rx.recv().await
    }

    /// Accumulate all remaining chunks.
    pub async fn collect_output(mut self) -> DemuxedOutput {
        let mut output = DemuxedOutput::default();
        while let Some(chunk) = self.next_chunk().await {
            output.extend(&chunk);
        }
        output
    }

    /// Stop consuming. The channel has been released when this returns.
    pub async fn cancel(mut self) {
        self.inner.shutdown().await;
    }
}

impl Stream for DemuxedStream {
    type Item = DemuxedOutput;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.rx.poll_recv(cx)
    }
}

/// How frame payloads are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    /// One decoder over all payloads in wire order. A character split by an
    /// interleaved frame of the other channel is not reassembled.
    Combined,
    /// One decoder per channel; each side is reassembled independently.
    PerChannel,
}

/// Receiving half plus the producer task feeding it.
struct Progressive<T> {
    rx: mpsc::Receiver<T>,
    producer: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Progressive<T> {
    fn spawn<R, F>(
        demux: FrameDemultiplexer<R>,
        capacity: usize,
        decoding: Decoding,
        map: F,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: Fn(StreamType, String) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let producer = tokio::spawn(produce(demux, tx, decoding, map));
        Self {
            rx,
            producer: Some(producer),
        }
    }

    async fn shutdown(&mut self) {
        self.rx.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
            // Resolves once the task future, and the channel it owns, is dropped.
            let _ = producer.await;
        }
    }
}

impl<T> Drop for Progressive<T> {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// Decode loop run by the producer task.
async fn produce<R, T, F>(
    mut demux: FrameDemultiplexer<R>,
    tx: mpsc::Sender<T>,
    decoding: Decoding,
    map: F,
) where
    R: AsyncRead + Unpin,
    F: Fn(StreamType, String) -> T,
{
    let mut stdout = TextDecoder::new();
    let mut stderr = TextDecoder::new();

    while let Some(frame) = demux.next_frame().await {
        let decoder = match (decoding, frame.stream) {
            (Decoding::PerChannel, StreamType::Stderr) => &mut stderr,
            _ => &mut stdout,
        };
        let text = decoder.decode(&frame.payload);
        if text.is_empty() {
            continue;
        }
        if tx.send(map(frame.stream, text)).await.is_err() {
            debug!("progressive output: consumer went away");
            return;
        }
    }
    // Release the channel before the sender signals end of output.
    drop(demux);

    for (stream, decoder) in [(StreamType::Stdout, &mut stdout), (StreamType::Stderr, &mut stderr)] {
        let tail = decoder.finish();
        if !tail.is_empty() && tx.send(map(stream, tail)).await.is_err() {
            return;
        }
    }
}
