//! Opaque upstream byte source for re-chunking.
//!
//! Connects to an upstream HTTP server, sends a minimal GET, discards the
//! response head, and exposes the remaining stream as raw bytes. The caller
//! forwards them chunk-by-chunk; nothing here interprets the body framing.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

/// Fixed read size used when forwarding the body.
pub const READ_SIZE: usize = 1024;

const MAX_HEAD_SIZE: usize = 64 * 1024;

/// A live upstream response body, positioned just past the response head.
#[derive(Debug)]
pub struct Upstream {
    stream: TcpStream,
    /// Body bytes that arrived in the same reads as the head.
    leftover: BytesMut,
}

impl Upstream {
    /// Fetches `target` and returns the response body as a byte source.
    ///
    /// Sends `connection: close` so the body ends at end-of-stream; status
    /// and headers of the upstream response are discarded, not interpreted.
    pub async fn get(target: &Url, connect_timeout: Duration) -> Result<Self> {
        let host = target.host_str().context("upstream url missing host")?;
        let port = target.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let mut stream = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .context("upstream connect timeout")?
            .context("failed to connect to upstream")?;

        tracing::trace!(upstream = %addr, "connected to upstream");

        let mut path = target.path().to_string();
        if let Some(query) = target.query() {
            path.push('?');
            path.push_str(query);
        }
        let request =
            format!("GET {path} HTTP/1.1\r\nhost: {host}\r\nconnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        // Scan for the end of the response head; whatever follows it in the
        // buffer is already body.
        let mut buf = BytesMut::with_capacity(READ_SIZE);
        loop {
            let n = stream.read_buf(&mut buf).await?;
            if n == 0 {
                anyhow::bail!("upstream closed before sending a complete response head");
            }
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                buf.advance(end + 4);
                return Ok(Self {
                    stream,
                    leftover: buf,
                });
            }
            if buf.len() > MAX_HEAD_SIZE {
                anyhow::bail!("upstream response head too large");
            }
        }
    }

    /// Reads body bytes into `out`; zero means the upstream is exhausted.
    pub async fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if !self.leftover.is_empty() {
            let n = self.leftover.len().min(out.len());
            out[..n].copy_from_slice(&self.leftover[..n]);
            self.leftover.advance(n);
            return Ok(n);
        }
        self.stream.read(out).await
    }
}
