//! Exec client integration tests.
//!
//! These tests drive `ExecClient` end to end over an in-memory transport
//! that serves scripted wire bytes through `tokio::io::duplex` and counts
//! how often each opened channel is closed.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

use container_exec::stream::{encode_frame, StreamConfig, StreamType};
use container_exec::transport::{BoxedChannel, ExecTransport, TransportError};
use container_exec::{
    ConsoleSize, ExecClient, ExecConfig, ExecError, ExecId, ExecInspect, ExecResult,
    ExecStartOptions, OutputMode,
};

const CONTAINER: &str = "web-1";
const EXEC_ID: &str = "3f9a1c0b7d2e";

// ============================================================================
// Test transport
// ============================================================================

/// Duplex channel that records when it is closed.
struct CountingChannel {
    inner: DuplexStream,
    closes: Arc<AtomicUsize>,
}

impl AsyncRead for CountingChannel {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountingChannel {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Drop for CountingChannel {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Engine stand-in with a single container and a single exec instance.
struct FakeTransport {
    wire: Vec<u8>,
    /// Keep the engine side open after the wire bytes are written.
    hold_open: bool,
    /// Duplex buffer size; small values fragment reads.
    pipe_size: usize,
    opened: AtomicUsize,
    detached: AtomicUsize,
    closes: Arc<AtomicUsize>,
    resizes: Mutex<Vec<ConsoleSize>>,
}

impl FakeTransport {
    fn serving(wire: Vec<u8>) -> Self {
        Self {
            wire,
            hold_open: false,
            pipe_size: 64 * 1024,
            opened: AtomicUsize::new(0),
            detached: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            resizes: Mutex::new(Vec::new()),
        }
    }

    fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    fn pipe_size(mut self, size: usize) -> Self {
        self.pipe_size = size;
        self
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn check(exec_id: &ExecId) -> Result<(), TransportError> {
        if exec_id.as_str() == EXEC_ID {
            Ok(())
        } else {
            Err(TransportError::not_found(format!(
                "No such exec instance: {}",
                exec_id
            )))
        }
    }
}

#[async_trait]
impl ExecTransport for FakeTransport {
    async fn create_exec(
        &self,
        container_id: &str,
        _config: &ExecConfig,
    ) -> Result<ExecId, TransportError> {
        if container_id != CONTAINER {
            return Err(TransportError::not_found(format!(
                "No such container: {}",
                container_id
            )));
        }
        Ok(ExecId::new(EXEC_ID).unwrap())
    }

    async fn inspect_exec(&self, exec_id: &ExecId) -> Result<ExecInspect, TransportError> {
        Self::check(exec_id)?;
        let json = serde_json::json!({
            "ID": exec_id.as_str(),
            "ContainerID": CONTAINER,
            "Running": false,
            "ExitCode": 3,
            "Pid": 4242,
        });
        Ok(serde_json::from_value(json).unwrap())
    }

    async fn start_detached(
        &self,
        exec_id: &ExecId,
        _options: &ExecStartOptions,
    ) -> Result<(), TransportError> {
        Self::check(exec_id)?;
        self.detached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open(
        &self,
        exec_id: &ExecId,
        _options: &ExecStartOptions,
    ) -> Result<BoxedChannel, TransportError> {
        Self::check(exec_id)?;

        let (client, mut server) = tokio::io::duplex(self.pipe_size);
        let wire = self.wire.clone();
        let hold_open = self.hold_open;
        tokio::spawn(async move {
            let _ = server.write_all(&wire).await;
            if hold_open {
                std::future::pending::<()>().await;
            }
        });

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingChannel {
            inner: client,
            closes: Arc::clone(&self.closes),
        }))
    }

    async fn resize_exec(&self, exec_id: &ExecId, size: ConsoleSize) -> Result<(), TransportError> {
        Self::check(exec_id)?;
        self.resizes.lock().unwrap().push(size);
        Ok(())
    }
}

fn exec_id() -> ExecId {
    ExecId::new(EXEC_ID).unwrap()
}

fn frames(parts: &[(StreamType, &str)]) -> Vec<u8> {
    parts
        .iter()
        .flat_map(|(stream, text)| encode_frame(*stream, text.as_bytes()))
        .collect()
}

fn stream_options() -> ExecStartOptions {
    ExecStartOptions::builder().stream(true).build().unwrap()
}

// ============================================================================
// Output delivery
// ============================================================================

#[tokio::test]
async fn test_stream_yields_lines_in_order_then_releases_once() {
    let transport = FakeTransport::serving(frames(&[
        (StreamType::Stdout, "line1\n"),
        (StreamType::Stdout, "line2\n"),
    ]));
    let client = ExecClient::new(transport);

    let result = client
        .run(
            CONTAINER,
            &ExecConfig::shell("echo line1 && echo line2"),
            stream_options(),
        )
        .await
        .unwrap();
    assert_eq!(result.mode(), OutputMode::Stream);

    let ExecResult::Stream(mut output) = result else {
        panic!("expected progressive output");
    };

    let mut chunks = Vec::new();
    while let Some(chunk) = output.next_chunk().await {
        chunks.push(chunk);
    }

    assert_eq!(chunks, vec!["line1\n".to_string(), "line2\n".to_string()]);
    assert_eq!(client.transport().opened(), 1);
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_complete_demuxed_separates_channels() {
    let transport = FakeTransport::serving(frames(&[
        (StreamType::Stdout, "out\n"),
        (StreamType::Stderr, "err\n"),
        (StreamType::Stdout, "more out\n"),
    ]));
    let client = ExecClient::new(transport);

    let options = ExecStartOptions::builder().demux(true).build().unwrap();
    let output = client
        .start(&exec_id(), options)
        .await
        .unwrap()
        .into_complete_demuxed()
        .unwrap();

    assert_eq!(output.stdout, "out\nmore out\n");
    assert_eq!(output.stderr, "err\n");
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_complete_combines_in_wire_order() {
    let transport = FakeTransport::serving(frames(&[
        (StreamType::Stdout, "a"),
        (StreamType::Stderr, "b"),
        (StreamType::Stdin, "ignored"),
        (StreamType::Stdout, "c"),
    ]));
    let client = ExecClient::new(transport);

    let text = client
        .start(&exec_id(), ExecStartOptions::default())
        .await
        .unwrap()
        .into_complete()
        .unwrap();

    assert_eq!(text, "abc");
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_stream_demuxed_chunks_are_one_sided() {
    let transport = FakeTransport::serving(frames(&[
        (StreamType::Stdout, "o1"),
        (StreamType::Stderr, "e1"),
        (StreamType::Stdout, "o2"),
    ]));
    let client = ExecClient::new(transport);

    let options = ExecStartOptions::builder()
        .stream(true)
        .demux(true)
        .build()
        .unwrap();
    let ExecResult::StreamDemuxed(output) = client.start(&exec_id(), options).await.unwrap() else {
        panic!("expected demuxed progressive output");
    };

    let chunks: Vec<_> = output.collect().await;
    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.stdout.is_empty() != chunk.stderr.is_empty());
    }
    assert_eq!(chunks[1].stderr, "e1");
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_tty_output_passes_through() {
    // Would be misread as a header if it were parsed.
    let raw = b"\x01\x00\x00\x00hello\r\nworld".to_vec();
    let transport = FakeTransport::serving(raw.clone()).pipe_size(3);
    let client = ExecClient::new(transport);

    let options = ExecStartOptions::builder().tty(true).build().unwrap();
    let text = client
        .start(&exec_id(), options)
        .await
        .unwrap()
        .into_complete()
        .unwrap();

    assert_eq!(text.as_bytes(), raw.as_slice());
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_fragmented_reads_reassemble_frames() {
    // "é" is split across two frames and every read is tiny.
    let mut wire = encode_frame(StreamType::Stdout, b"h\xc3");
    wire.extend(encode_frame(StreamType::Stdout, b"\xa9llo\n"));
    let transport = FakeTransport::serving(wire).pipe_size(5);
    let client = ExecClient::new(transport).with_stream_config(StreamConfig::new(4, 2));

    let ExecResult::Stream(output) = client.start(&exec_id(), stream_options()).await.unwrap()
    else {
        panic!("expected progressive output");
    };

    assert_eq!(output.collect_text().await, "héllo\n");
}

#[tokio::test]
async fn test_stream_concatenation_matches_complete() {
    let wire = frames(&[
        (StreamType::Stdout, "one\n"),
        (StreamType::Stderr, "two\n"),
        (StreamType::Stdout, "three\n"),
    ]);

    let streamed = {
        let client = ExecClient::new(FakeTransport::serving(wire.clone()));
        let ExecResult::Stream(output) = client.start(&exec_id(), stream_options()).await.unwrap()
        else {
            panic!("expected progressive output");
        };
        output.collect_text().await
    };

    let complete = {
        let client = ExecClient::new(FakeTransport::serving(wire));
        client
            .start(&exec_id(), ExecStartOptions::default())
            .await
            .unwrap()
            .into_complete()
            .unwrap()
    };

    assert_eq!(streamed, complete);
}

#[tokio::test]
async fn test_truncated_stream_ends_without_error() {
    let mut wire = frames(&[(StreamType::Stdout, "whole\n")]);
    wire.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 50]);
    wire.extend_from_slice(b"part");
    let client = ExecClient::new(FakeTransport::serving(wire));

    let text = client
        .start(&exec_id(), ExecStartOptions::default())
        .await
        .unwrap()
        .into_complete()
        .unwrap();

    assert!(text.starts_with("whole\n"));
    assert_eq!(client.transport().closes(), 1);
}

// ============================================================================
// Channel lifecycle
// ============================================================================

#[tokio::test]
async fn test_cancel_after_first_chunk_releases_once() {
    let transport =
        FakeTransport::serving(frames(&[(StreamType::Stdout, "line1\n")])).held_open();
    let client = ExecClient::new(transport);

    let ExecResult::Stream(mut output) = client.start(&exec_id(), stream_options()).await.unwrap()
    else {
        panic!("expected progressive output");
    };

    assert_eq!(output.next_chunk().await.as_deref(), Some("line1\n"));
    assert_eq!(client.transport().closes(), 0);

    output.cancel().await;
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_dropping_stream_releases_once() {
    let transport =
        FakeTransport::serving(frames(&[(StreamType::Stdout, "line1\n")])).held_open();
    let client = ExecClient::new(transport);

    let ExecResult::Stream(mut output) = client.start(&exec_id(), stream_options()).await.unwrap()
    else {
        panic!("expected progressive output");
    };
    output.next().await;
    drop(output);

    // The aborted producer is dropped by the runtime shortly after.
    tokio::time::timeout(Duration::from_secs(1), async {
        while client.transport().closes() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_socket_mode_hands_channel_to_caller() {
    let wire = frames(&[(StreamType::Stdout, "raw")]);
    let transport = FakeTransport::serving(wire.clone());
    let client = ExecClient::new(transport);

    let options = ExecStartOptions::builder().socket(true).build().unwrap();
    let ExecResult::Socket(mut channel) = client.start(&exec_id(), options).await.unwrap() else {
        panic!("expected socket");
    };
    assert_eq!(client.transport().closes(), 0);

    let mut received = vec![0u8; wire.len()];
    channel.read_exact(&mut received).await.unwrap();
    assert_eq!(received, wire);

    drop(channel);
    assert_eq!(client.transport().closes(), 1);
}

#[tokio::test]
async fn test_detached_opens_no_channel() {
    let client = ExecClient::new(FakeTransport::serving(Vec::new()));

    let options = ExecStartOptions::builder().detach(true).build().unwrap();
    let result = client.start(&exec_id(), options).await.unwrap();

    assert!(matches!(result, ExecResult::Detached));
    assert_eq!(client.transport().detached.load(Ordering::SeqCst), 1);
    assert_eq!(client.transport().opened(), 0);
}

// ============================================================================
// Errors and instance management
// ============================================================================

#[tokio::test]
async fn test_unknown_exec_is_not_found_without_channel() {
    let client = ExecClient::new(FakeTransport::serving(Vec::new()));
    let missing = ExecId::new("doesnotexist").unwrap();

    let err = client.start(&missing, stream_options()).await.unwrap_err();

    assert!(matches!(err, ExecError::ExecNotFound(ref id) if id == "doesnotexist"));
    assert!(err.is_not_found());
    assert_eq!(client.transport().opened(), 0);
    assert_eq!(client.transport().closes(), 0);
}

#[tokio::test]
async fn test_unknown_container_is_not_found() {
    let client = ExecClient::new(FakeTransport::serving(Vec::new()));

    let err = client
        .create("ghost", &ExecConfig::new(["true"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::ContainerNotFound(ref c) if c == "ghost"));
}

#[tokio::test]
async fn test_inspect_and_wait() {
    let client = ExecClient::new(FakeTransport::serving(Vec::new()));

    let inspect = client.inspect(&exec_id()).await.unwrap();
    assert_eq!(inspect.exit_code(), Some(3));
    assert!(!inspect.success());

    let code = client
        .wait_with_interval(&exec_id(), Duration::from_millis(1), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(code, 3);
}

#[tokio::test]
async fn test_resize() {
    let client = ExecClient::new(FakeTransport::serving(Vec::new()));

    client
        .resize(&exec_id(), ConsoleSize::new(40, 120))
        .await
        .unwrap();
    assert_eq!(
        *client.transport().resizes.lock().unwrap(),
        vec![ConsoleSize::new(40, 120)]
    );

    let err = client
        .resize(&exec_id(), ConsoleSize::new(0, 120))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::InvalidOptions(_)));
    assert_eq!(client.transport().resizes.lock().unwrap().len(), 1);
}

#[test]
fn test_conflicting_options_rejected_before_any_call() {
    assert!(ExecStartOptions::builder()
        .stream(true)
        .socket(true)
        .build()
        .is_err());
    assert!(ExecStartOptions::builder()
        .tty(true)
        .demux(true)
        .build()
        .is_err());
}
