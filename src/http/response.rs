//! Response status codes and status-line formatting.

use std::fmt;

pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP response status.
///
/// Reason phrases are mapped for the codes this server synthesizes itself;
/// any other numeric code is emitted without a reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 500 Internal Server Error
    InternalServerError,
    /// Any other numeric code, emitted without a reason phrase.
    Other(u16),
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self {
            StatusCode::Ok => Some("OK"),
            StatusCode::BadRequest => Some("Bad Request"),
            StatusCode::InternalServerError => Some("Internal Server Error"),
            StatusCode::Other(_) => None,
        }
    }

    /// The status line for this code, without the trailing CRLF.
    pub fn status_line(&self) -> String {
        match self.reason_phrase() {
            Some(reason) => format!("{} {} {}", HTTP_VERSION, self.as_u16(), reason),
            None => format!("{} {}", HTTP_VERSION, self.as_u16()),
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            400 => StatusCode::BadRequest,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
