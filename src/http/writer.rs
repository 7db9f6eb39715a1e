//! Strictly-ordered response serialization.
//!
//! [`ResponseWriter`] enforces the legal write order with a state tag:
//! status line, then headers, then exactly one body mode. Calling an
//! operation out of order is rejected before any bytes reach the sink, so
//! the wire never sees a partially reordered response. Nothing is buffered;
//! every operation writes straight through.

use std::fmt;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{HeaderMap, SEPARATOR};
use crate::http::response::StatusCode;

/// Writer position within the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Initialized,
    StatusLine,
    Headers,
    /// Fixed-length body written; terminal for that mode.
    Body,
    /// Chunked mode selected by the headers; chunks may be written.
    ChunkedBody,
    /// Terminating zero chunk written; trailers may follow.
    ChunkedBodyDone,
    Trailers,
    /// Final separator written; the message is complete.
    Done,
    /// A write failed; the connection is unusable.
    Error,
}

#[derive(Debug)]
pub enum WriteError {
    /// Operation called from a state that does not permit it.
    InvalidState {
        operation: &'static str,
        state: WriteState,
    },
    Io(io::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not legal in writer state {state:?}")
            }
            Self::Io(e) => write!(f, "io error while writing response: {e}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Serializes one response onto a borrowed sink, in wire order only.
pub struct ResponseWriter<'a, W: AsyncWrite + Unpin> {
    sink: &'a mut W,
    state: WriteState,
}

impl<'a, W: AsyncWrite + Unpin> ResponseWriter<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            state: WriteState::Initialized,
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: &[WriteState],
    ) -> Result<(), WriteError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WriteError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Writes through to the sink; any failure latches the `Error` state.
    async fn emit(&mut self, data: &[u8]) -> Result<(), WriteError> {
        if let Err(e) = self.sink.write_all(data).await {
            self.state = WriteState::Error;
            return Err(WriteError::Io(e));
        }
        Ok(())
    }

    /// `HTTP/1.1 <code> <reason>` CRLF. Legal only as the first write.
    pub async fn write_status_line(&mut self, code: StatusCode) -> Result<(), WriteError> {
        self.require("write_status_line", &[WriteState::Initialized])?;
        let mut line = code.status_line().into_bytes();
        line.extend_from_slice(SEPARATOR);
        self.emit(&line).await?;
        self.state = WriteState::StatusLine;
        Ok(())
    }

    /// Emits every header as `name: value` CRLF plus the terminating blank
    /// line. Selects chunked emission when the map carries
    /// `transfer-encoding: chunked`; handlers opt in purely through that
    /// header.
    pub async fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), WriteError> {
        self.require("write_headers", &[WriteState::StatusLine])?;
        let mut block = Vec::new();
        for (name, value) in headers.iter() {
            block.extend_from_slice(name.as_bytes());
            block.extend_from_slice(b": ");
            block.extend_from_slice(value.as_bytes());
            block.extend_from_slice(SEPARATOR);
        }
        block.extend_from_slice(SEPARATOR);
        self.emit(&block).await?;
        self.state = if headers.is_chunked() {
            WriteState::ChunkedBody
        } else {
            WriteState::Headers
        };
        Ok(())
    }

    /// Writes a fixed-length body verbatim. Terminal for this mode.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.require("write_body", &[WriteState::Headers])?;
        self.emit(data).await?;
        self.state = WriteState::Body;
        Ok(())
    }

    /// Raw passthrough for callers that stream a prepared body themselves
    /// (for example a file read in one shot after the headers).
    pub async fn write(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.require("write", &[WriteState::Headers, WriteState::Body])?;
        self.emit(data).await?;
        self.state = WriteState::Body;
        Ok(())
    }

    /// One chunk: `<hex length>` CRLF payload CRLF. Re-entrant; an empty
    /// payload is legal and emits an empty chunk line.
    pub async fn write_chunked_body(&mut self, payload: &[u8]) -> Result<(), WriteError> {
        self.require("write_chunked_body", &[WriteState::ChunkedBody])?;
        let mut chunk = format!("{:x}", payload.len()).into_bytes();
        chunk.extend_from_slice(SEPARATOR);
        chunk.extend_from_slice(payload);
        chunk.extend_from_slice(SEPARATOR);
        self.emit(&chunk).await
    }

    /// The terminating zero chunk, `0` CRLF CRLF.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        self.require("write_chunked_body_done", &[WriteState::ChunkedBody])?;
        self.emit(b"0\r\n\r\n").await?;
        self.state = WriteState::ChunkedBodyDone;
        Ok(())
    }

    /// Trailer header lines, one per field, with no terminating blank line;
    /// the caller closes the block with [`write_separator`].
    ///
    /// [`write_separator`]: ResponseWriter::write_separator
    pub async fn write_trailers(&mut self, trailers: &HeaderMap) -> Result<(), WriteError> {
        self.require(
            "write_trailers",
            &[WriteState::ChunkedBodyDone, WriteState::Trailers],
        )?;
        let mut block = Vec::new();
        for (name, value) in trailers.iter() {
            block.extend_from_slice(name.as_bytes());
            block.extend_from_slice(b": ");
            block.extend_from_slice(value.as_bytes());
            block.extend_from_slice(SEPARATOR);
        }
        self.emit(&block).await?;
        self.state = WriteState::Trailers;
        Ok(())
    }

    /// The final CRLF that closes the trailer block (or, with no trailers,
    /// the message).
    pub async fn write_separator(&mut self) -> Result<(), WriteError> {
        self.require(
            "write_separator",
            &[WriteState::ChunkedBodyDone, WriteState::Trailers],
        )?;
        self.emit(SEPARATOR).await?;
        self.state = WriteState::Done;
        Ok(())
    }
}
