use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use httpwire::config::Config;
use httpwire::http::{HeaderMap, Request, ResponseWriter, StatusCode};
use httpwire::server::{self, Handler, HandlerError, Server};

struct TestHandler;

impl Handler for TestHandler {
    async fn handle(
        &self,
        writer: &mut ResponseWriter<'_, TcpStream>,
        request: &Request,
    ) -> Option<HandlerError> {
        match request.request_line.target.as_str() {
            "/teapot" => Some(HandlerError::new(StatusCode::Other(418), "short and stout\n")),
            "/boom" => Some(HandlerError::new(
                StatusCode::InternalServerError,
                "it broke\n",
            )),
            "/chunked" => {
                let mut headers = HeaderMap::default_for_length(0);
                headers.remove("content-length");
                headers.set("transfer-encoding", "chunked");
                writer.write_status_line(StatusCode::Ok).await.ok()?;
                writer.write_headers(&headers).await.ok()?;
                writer.write_chunked_body(b"hello").await.ok()?;
                writer.write_chunked_body(b"!").await.ok()?;
                writer.write_chunked_body_done().await.ok()?;
                writer.write_separator().await.ok()?;
                None
            }
            _ => {
                let message = "hello from test\n";
                writer.write_status_line(StatusCode::Ok).await.ok()?;
                writer
                    .write_headers(&HeaderMap::default_for_length(message.len()))
                    .await
                    .ok()?;
                writer.write_body(message.as_bytes()).await.ok()?;
                None
            }
        }
    }
}

async fn start_server() -> Server {
    let cfg = Config {
        listen_addr: "127.0.0.1:0".to_string(),
        ..Config::default()
    };
    server::serve(cfg, TestHandler).await.unwrap()
}

async fn roundtrip(server: &Server, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_fixed_length_response() {
    let server = start_server().await;

    let response = roundtrip(&server, b"GET / HTTP/1.1\r\nHost: test\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("content-length: 16\r\n"));
    assert!(text.contains("connection: close\r\n"));
    assert!(text.ends_with("hello from test\n"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_malformed_request_yields_400_with_error_body() {
    let server = start_server().await;

    let response = roundtrip(&server, b"NOT-AN-HTTP-REQUEST\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.contains("request line must have exactly three parts"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_handler_error_is_honored_verbatim() {
    let server = start_server().await;

    let response = roundtrip(&server, b"GET /boom HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();
    assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(text.ends_with("it broke\n"));

    let response = roundtrip(&server, b"GET /teapot HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();
    assert!(text.starts_with("HTTP/1.1 418\r\n"));
    assert!(text.ends_with("short and stout\n"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_chunked_response_over_the_wire() {
    let server = start_server().await;

    let response = roundtrip(&server, b"GET /chunked HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("transfer-encoding: chunked\r\n"));
    assert!(text.ends_with("5\r\nhello\r\n1\r\n!\r\n0\r\n\r\n\r\n"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_content_length_mismatch_reported_to_peer() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream
        .write_all(b"POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\nonly fifty")
        .await
        .unwrap();
    // Close our write half so the server sees end-of-stream mid-body.
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.contains("content-length reported does not match"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_handled_connections_are_independent() {
    let server = start_server().await;

    // A connection that never sends anything must not block other clients.
    let _idle = TcpStream::connect(server.local_addr()).await.unwrap();

    let response = roundtrip(&server, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));

    server.close().unwrap();
}

#[tokio::test]
async fn test_close_twice_is_a_usage_error() {
    let server = start_server().await;

    server.close().unwrap();
    assert!(server.close().is_err());
}
