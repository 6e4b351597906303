//! Scoped ownership of an exec channel.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use super::BoxedChannel;
use crate::exec::ExecId;

/// Owns the duplex channel of one exec session.
///
/// The channel is released exactly once: on [`release`](Self::release),
/// or when the lease is dropped. [`into_socket`](Self::into_socket) hands the
/// channel to the caller instead, after which the lease never touches it.
///
/// Reads after release report end of input; writes fail with `NotConnected`.
pub struct ChannelLease {
    exec_id: ExecId,
    channel: Option<BoxedChannel>,
}

impl ChannelLease {
    /// Take ownership of a freshly opened channel.
    pub fn new(exec_id: ExecId, channel: BoxedChannel) -> Self {
        debug!("exec {}: channel opened", exec_id);
        Self {
            exec_id,
            channel: Some(channel),
        }
    }

    /// The exec this channel belongs to.
    pub fn exec_id(&self) -> &ExecId {
        &self.exec_id
    }

    /// Whether the channel has been released or handed off.
    pub fn is_released(&self) -> bool {
        self.channel.is_none()
    }

    /// Close the channel. Further calls do nothing.
    pub fn release(&mut self) {
        if let Some(channel) = self.channel.take() {
            drop(channel);
            debug!("exec {}: channel released", self.exec_id);
        }
    }

    /// Transfer the channel to the caller, who becomes responsible for
    /// closing it. Returns `None` if it was already released.
    pub fn into_socket(mut self) -> Option<BoxedChannel> {
        let channel = self.channel.take();
        if channel.is_some() {
            debug!("exec {}: channel handed to caller", self.exec_id);
        }
        channel
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl AsyncRead for ChannelLease {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().channel.as_mut() {
            Some(channel) => Pin::new(channel).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl AsyncWrite for ChannelLease {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().channel.as_mut() {
            Some(channel) => Pin::new(channel).poll_write(cx, buf),
            None => Poll::Ready(Err(released())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().channel.as_mut() {
            Some(channel) => Pin::new(channel).poll_flush(cx),
            None => Poll::Ready(Err(released())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().channel.as_mut() {
            Some(channel) => Pin::new(channel).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

fn released() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "exec channel released")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Channel that counts how many times it has been closed.
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

    fn lease() -> (ChannelLease, DuplexStream, Arc<AtomicUsize>) {
        let (client, server) = tokio::io::duplex(256);
        let closes = Arc::new(AtomicUsize::new(0));
        let channel = CountingChannel {
            inner: client,
            closes: Arc::clone(&closes),
        };
        let id: ExecId = "abc123".parse().unwrap();
        (ChannelLease::new(id, Box::new(channel)), server, closes)
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut lease, _server, closes) = lease();
        assert!(!lease.is_released());

        lease.release();
        lease.release();
        assert!(lease.is_released());
        drop(lease);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let (lease, _server, closes) = lease();
        drop(lease);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_socket_handoff_skips_release() {
        let (lease, _server, closes) = lease();
        let socket = lease.into_socket().expect("channel still owned");
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        drop(socket);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handoff_after_release() {
        let (mut lease, _server, _closes) = lease();
        lease.release();
        assert!(lease.into_socket().is_none());
    }

    #[tokio::test]
    async fn test_reads_and_writes_pass_through() {
        let (mut lease, mut server, _closes) = lease();

        server.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        lease.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        lease.write_all(b"pong").await.unwrap();
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test]
    async fn test_io_after_release() {
        let (mut lease, _server, _closes) = lease();
        lease.release();

        let mut buf = [0u8; 8];
        assert_eq!(lease.read(&mut buf).await.unwrap(), 0);

        let err = lease.write_all(b"late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_exec_id() {
        let (lease, _server, _closes) = lease();
        assert_eq!(lease.exec_id().as_str(), "abc123");
    }
}
