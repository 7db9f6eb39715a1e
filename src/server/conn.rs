//! Per-connection request/response cycle.
//!
//! One connection, one cycle: parse the request fully, dispatch it, write
//! the response, close. Error disposition lives here — the parser and
//! writer only ever return their errors, and this is the single layer with
//! a live connection to report back on.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::http::request::request_from_reader;
use crate::http::{ResponseWriter, StatusCode};
use crate::server::{Handler, HandlerError};

/// Runs one connection under a deadline, then shuts the stream down.
///
/// The deadline bounds the whole cycle so a slow or stalled peer cannot
/// hold the connection open indefinitely.
pub async fn handle<H: Handler>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    deadline: Duration,
) {
    debug!(%peer, "accepted connection");
    match timeout(deadline, cycle(&mut stream, handler.as_ref(), peer)).await {
        Ok(Ok(())) => debug!(%peer, "connection complete"),
        Ok(Err(e)) => error!(%peer, error = %e, "connection error"),
        Err(_) => warn!(%peer, "connection deadline exceeded"),
    }
    let _ = stream.shutdown().await;
}

/// Parse → dispatch → respond. Every fatal condition still produces a
/// well-formed response; peers never see a bare connection reset.
async fn cycle<H: Handler>(
    stream: &mut TcpStream,
    handler: &H,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    let request = match request_from_reader(stream).await {
        Ok(request) => request,
        Err(e) => {
            // Malformed input: a 400 with the parse error as body, and the
            // application handler is never invoked.
            warn!(%peer, error = %e, "malformed request");
            HandlerError::new(StatusCode::BadRequest, e.to_string())
                .write_to(stream)
                .await?;
            return Ok(());
        }
    };

    debug!(
        %peer,
        method = %request.request_line.method,
        target = %request.request_line.target,
        "request parsed"
    );

    let handler_error = {
        let mut writer = ResponseWriter::new(&mut *stream);
        handler.handle(&mut writer, &request).await
    };

    if let Some(e) = handler_error {
        warn!(%peer, code = %e.code, "handler reported error");
        e.write_to(stream).await?;
    }

    Ok(())
}
