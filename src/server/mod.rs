//! Listener ownership and the accept loop.
//!
//! [`serve`] binds the socket and hands every accepted connection to its own
//! task, so one slow client never stalls the others. The returned [`Server`]
//! handle stops the loop through an atomic closed flag; closing twice is a
//! usage error.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{error, info};

use crate::config::Config;
use crate::http::writer::WriteError;
use crate::http::{HeaderMap, Request, ResponseWriter, StatusCode};

pub mod conn;

/// A handler-reported failure: the server synthesizes this status and body
/// instead of whatever the handler would otherwise have written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub code: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Writes this error as a complete fixed-length response.
    pub async fn write_to<W: AsyncWrite + Unpin>(
        &self,
        sink: &mut W,
    ) -> Result<(), WriteError> {
        let mut writer = ResponseWriter::new(sink);
        writer.write_status_line(self.code).await?;
        writer
            .write_headers(&HeaderMap::default_for_length(self.message.len()))
            .await?;
        writer.write_body(self.message.as_bytes()).await
    }
}

/// Application callback, invoked once per successfully parsed request with
/// write access to the response writer. Returning `Some` asks the server to
/// synthesize that error response instead.
pub trait Handler: Send + Sync + 'static {
    fn handle(
        &self,
        writer: &mut ResponseWriter<'_, TcpStream>,
        request: &Request,
    ) -> impl Future<Output = Option<HandlerError>> + Send;
}

/// Running server handle. Dropping it does not stop the accept loop; call
/// [`Server::close`].
pub struct Server {
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    local_addr: SocketAddr,
}

/// Binds `cfg.listen_addr` and spawns the accept loop.
pub async fn serve<H: Handler>(cfg: Config, handler: H) -> anyhow::Result<Server> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    let local_addr = listener.local_addr()?;
    info!("listening on {}", local_addr);

    let closed = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(Notify::new());
    tokio::spawn(accept_loop(
        listener,
        Arc::new(handler),
        cfg,
        Arc::clone(&closed),
        Arc::clone(&shutdown),
    ));

    Ok(Server {
        closed,
        shutdown,
        local_addr,
    })
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    cfg: Config,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    loop {
        if closed.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handler = Arc::clone(&handler);
                    let deadline = cfg.request_timeout();
                    tokio::spawn(async move {
                        conn::handle(stream, peer, handler, deadline).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            },
        }
    }
    info!("accept loop stopped");
}

impl Server {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the accept loop. A second close is reported as a usage error.
    pub fn close(&self) -> anyhow::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            anyhow::bail!("server: closing an already closed server");
        }
        self.shutdown.notify_one();
        Ok(())
    }
}
