use anyhow::Result;
use tokio::net::TcpStream;
use tracing::{error, info};
use url::Url;

use httpwire::config::Config;
use httpwire::http::{HeaderMap, Request, ResponseWriter, StatusCode};
use httpwire::server::{self, Handler, HandlerError};
use httpwire::upstream::{READ_SIZE, Upstream};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = server::serve(cfg.clone(), AppHandler { cfg }).await?;
    info!("server started on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    server.close()?;
    info!("server gracefully stopped");

    Ok(())
}

struct AppHandler {
    cfg: Config,
}

impl Handler for AppHandler {
    async fn handle(
        &self,
        writer: &mut ResponseWriter<'_, TcpStream>,
        request: &Request,
    ) -> Option<HandlerError> {
        let target = request.request_line.target.as_str();
        match target {
            "/yourproblem" => Some(HandlerError::new(
                StatusCode::BadRequest,
                "Your problem is not my problem\n",
            )),
            "/myproblem" => Some(HandlerError::new(
                StatusCode::InternalServerError,
                "Woopsie, my bad\n",
            )),
            _ if target.starts_with("/httpbin/") => {
                let rest = target.trim_start_matches("/httpbin");
                self.relay(writer, rest).await
            }
            _ => {
                let message = "All good, frfr\n";
                let result = async {
                    writer.write_status_line(StatusCode::Ok).await?;
                    writer
                        .write_headers(&HeaderMap::default_for_length(message.len()))
                        .await?;
                    writer.write_body(message.as_bytes()).await
                }
                .await;
                if let Err(e) = result {
                    error!(error = %e, "writing response");
                }
                None
            }
        }
    }
}

impl AppHandler {
    /// Streams an upstream body back to the client as chunks, with an
    /// `x-content-length` trailer carrying the total forwarded byte count.
    async fn relay(
        &self,
        writer: &mut ResponseWriter<'_, TcpStream>,
        path: &str,
    ) -> Option<HandlerError> {
        let url = match Url::parse(&format!("{}{}", self.cfg.upstream_base, path)) {
            Ok(url) => url,
            Err(e) => {
                return Some(HandlerError::new(
                    StatusCode::InternalServerError,
                    format!("bad upstream url: {e}\n"),
                ));
            }
        };

        let mut upstream = match Upstream::get(&url, self.cfg.connect_timeout()).await {
            Ok(upstream) => upstream,
            Err(e) => {
                return Some(HandlerError::new(
                    StatusCode::Other(502),
                    format!("upstream fetch failed: {e}\n"),
                ));
            }
        };

        let mut headers = HeaderMap::default_for_length(0);
        headers.remove("content-length");
        headers.set("transfer-encoding", "chunked");
        headers.set("trailer", "x-content-length");

        let mut total = 0usize;
        let result: anyhow::Result<()> = async {
            writer.write_status_line(StatusCode::Ok).await?;
            writer.write_headers(&headers).await?;

            let mut buf = [0u8; READ_SIZE];
            loop {
                let n = upstream.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                total += n;
                writer.write_chunked_body(&buf[..n]).await?;
            }
            writer.write_chunked_body_done().await?;

            let mut trailers = HeaderMap::new();
            trailers.set("x-content-length", total.to_string());
            writer.write_trailers(&trailers).await?;
            writer.write_separator().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!(error = %e, "relaying upstream stream");
        }
        None
    }
}
