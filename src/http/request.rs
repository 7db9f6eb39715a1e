//! Incremental HTTP/1.1 request parsing.
//!
//! The parser is resumable: [`Request::parse`] consumes as many complete
//! request-line / header-line / body units as the supplied bytes allow and
//! reports how much it ate, so the caller can keep feeding it as data
//! trickles in. [`request_from_reader`] is the driving loop that pairs the
//! parser with a growable read buffer.

use std::fmt;
use std::io;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{HeaderMap, SEPARATOR};

/// Starting capacity of the per-request read buffer.
pub const INITIAL_BUFFER_SIZE: usize = 1024;
/// Hard cap on the read buffer; exceeding it is a fatal parse error.
pub const MAX_BUFFER_SIZE: usize = 65536;

#[derive(Debug)]
pub enum ParseError {
    /// Request line did not have exactly three space-separated parts.
    MalformedRequestLine,
    /// Version token did not match `HTTP/<digits>[.<digits>]`.
    InvalidVersion,
    /// Header name contains characters outside the token grammar.
    InvalidHeaderName,
    /// Whitespace inside the header name or between name and colon.
    InvalidHeaderSpacing,
    /// `content-length` value is not a non-negative integer.
    InvalidContentLength,
    /// Stream ended with fewer body bytes than `content-length` promised.
    ContentLengthMismatch,
    /// Read buffer grew past [`MAX_BUFFER_SIZE`].
    BufferOverflow,
    /// Caller fed more data after the request was already complete.
    RequestComplete,
    Io(io::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequestLine => {
                write!(f, "request line must have exactly three parts")
            }
            Self::InvalidVersion => {
                write!(f, "http version does not match HTTP/<digits>[.<digits>]")
            }
            Self::InvalidHeaderName => {
                write!(f, "header name contains invalid characters")
            }
            Self::InvalidHeaderSpacing => {
                write!(f, "header name contains whitespace in invalid locations")
            }
            Self::InvalidContentLength => {
                write!(f, "content-length is not a valid number")
            }
            Self::ContentLengthMismatch => {
                write!(f, "content-length reported does not match actual body length")
            }
            Self::BufferOverflow => {
                write!(
                    f,
                    "request exceeded maximum buffer size of {MAX_BUFFER_SIZE} bytes"
                )
            }
            Self::RequestComplete => {
                write!(f, "data fed to an already completed request")
            }
            Self::Io(e) => write!(f, "io error while reading request: {e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Where the parser currently is within the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Initialized,
    Headers,
    Body,
    Done,
}

/// `METHOD SP TARGET SP HTTP/<version>`, parsed from the first line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    /// Numeric part only, e.g. `"1.1"`.
    pub version: String,
}

/// A parsed (or in-progress) HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    state: ParseState,
}

impl Request {
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: ParseState::Initialized,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Advances the state machine over `data`, consuming as many complete
    /// units as are available. Returns the number of bytes consumed; zero
    /// progress means the caller must supply more bytes.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.state == ParseState::Done {
            return Err(ParseError::RequestComplete);
        }

        let mut total = 0;
        loop {
            let remaining = &data[total..];
            let n = match self.state {
                ParseState::Initialized => self.parse_request_line(remaining)?,
                ParseState::Headers => self.parse_header_lines(remaining)?,
                ParseState::Body => self.parse_body(remaining)?,
                ParseState::Done => return Ok(total),
            };
            if n == 0 {
                return Ok(total);
            }
            total += n;
            if total == data.len() {
                return Ok(total);
            }
        }
    }

    fn parse_request_line(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let Some(separator_index) =
            data.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
        else {
            return Ok(0);
        };
        let line = std::str::from_utf8(&data[..separator_index])
            .map_err(|_| ParseError::MalformedRequestLine)?;

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version_token] = parts.as_slice() else {
            return Err(ParseError::MalformedRequestLine);
        };
        if method.is_empty() || target.is_empty() {
            return Err(ParseError::MalformedRequestLine);
        }

        self.request_line = RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            version: extract_version(version_token)?,
        };
        self.headers = HeaderMap::new();
        self.state = ParseState::Headers;
        Ok(separator_index + SEPARATOR.len())
    }

    fn parse_header_lines(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut total = 0;
        loop {
            let (n, done) = self.headers.parse_line(&data[total..])?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
            if done {
                // A zero content-length body is already complete.
                self.state = match self.headers.content_length()? {
                    Some(n) if n > 0 => ParseState::Body,
                    _ => ParseState::Done,
                };
                return Ok(total);
            }
            if total == data.len() {
                return Ok(total);
            }
        }
    }

    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let content_length = self.headers.content_length()?.unwrap_or_default();
        let needed = content_length.saturating_sub(self.body.len());
        if needed == 0 {
            self.state = ParseState::Done;
            return Ok(0);
        }
        let take = needed.min(data.len());
        self.body.extend_from_slice(&data[..take]);
        if self.body.len() == content_length {
            self.state = ParseState::Done;
        }
        Ok(take)
    }

    /// Completion invariant: when a `content-length` header was present,
    /// the body must be exactly that long.
    fn check_content_length(&self) -> Result<(), ParseError> {
        match self.headers.content_length()? {
            Some(expected) if expected != self.body.len() => {
                Err(ParseError::ContentLengthMismatch)
            }
            _ => Ok(()),
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_version(token: &str) -> Result<String, ParseError> {
    let version = token
        .strip_prefix("HTTP/")
        .ok_or(ParseError::InvalidVersion)?;
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let mut parts = version.split('.');
    let major = parts.next().unwrap_or_default();
    if !is_digits(major) {
        return Err(ParseError::InvalidVersion);
    }
    if let Some(minor) = parts.next() {
        if !is_digits(minor) || parts.next().is_some() {
            return Err(ParseError::InvalidVersion);
        }
    }
    Ok(version.to_string())
}

/// Reads one full request from `reader`.
///
/// Reads land in a growable buffer whose capacity doubles whenever it fills
/// before the parser can make progress, up to [`MAX_BUFFER_SIZE`]. Consumed
/// bytes are compacted out between reads, so only the unconsumed tail is
/// ever retained. End-of-stream is not an error: the request is taken as
/// complete with whatever was parsed, and the final content-length check
/// reports a short body.
pub async fn request_from_reader<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut capacity = INITIAL_BUFFER_SIZE;
    let mut buf = BytesMut::with_capacity(capacity);
    let mut request = Request::new();

    while !request.is_done() {
        if buf.len() == capacity {
            capacity *= 2;
            if capacity > MAX_BUFFER_SIZE {
                return Err(ParseError::BufferOverflow);
            }
        }

        // Read into the buffer tail, never past the current capacity.
        let filled = buf.len();
        buf.resize(capacity, 0);
        let n = reader.read(&mut buf[filled..]).await?;
        buf.truncate(filled + n);
        if n == 0 {
            break;
        }

        let consumed = request.parse(&buf[..])?;
        if consumed > 0 {
            buf.advance(consumed);
        }
    }

    request.check_content_length()?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_numeric_part_only() {
        assert_eq!(extract_version("HTTP/1.1").unwrap(), "1.1");
        assert_eq!(extract_version("HTTP/2").unwrap(), "2");
        assert!(matches!(
            extract_version("HTTP/x.y"),
            Err(ParseError::InvalidVersion)
        ));
        assert!(matches!(
            extract_version("SPDY/1.1"),
            Err(ParseError::InvalidVersion)
        ));
    }
}
