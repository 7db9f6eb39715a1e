//! Case-insensitive header storage and incremental field-line parsing.

use std::collections::HashMap;

use crate::http::request::ParseError;

/// CRLF, the line separator used everywhere in HTTP/1.1.
pub const SEPARATOR: &[u8] = b"\r\n";

pub const CONTENT_LENGTH: &str = "content-length";
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

/// HTTP header fields, keyed by lowercased name.
///
/// Iteration order is unordered by contract; callers that need a specific
/// wire order must not rely on it. Duplicate names are merged as
/// `"old, new"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default response headers for a fixed-length body of `content_size`
    /// bytes. Handlers may override any of these.
    pub fn default_for_length(content_size: usize) -> Self {
        let mut headers = Self::new();
        headers.set(CONTENT_LENGTH, content_size.to_string());
        headers.set("connection", "close");
        headers.set("content-type", "text/plain");
        headers
    }

    /// Consumes at most one CRLF-terminated field line from `data`.
    ///
    /// Returns `(bytes_consumed, done)`:
    /// - separator at offset 0 is the blank terminator line: `(2, true)`,
    ///   the caller must leave the header phase;
    /// - no separator yet: `(0, false)`, the caller must wait for more
    ///   bytes;
    /// - otherwise the line is validated, merged, and
    ///   `(separator_index + 2, false)` is returned.
    pub fn parse_line(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(separator_index) = find_separator(data) else {
            return Ok((0, false));
        };
        if separator_index == 0 {
            return Ok((SEPARATOR.len(), true));
        }

        let line = std::str::from_utf8(&data[..separator_index])
            .map_err(|_| ParseError::InvalidHeaderName)?;
        let (name, value) = validate_field_line(line)?;
        self.merge(&name, value);

        Ok((separator_index + SEPARATOR.len(), false))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    /// Case-insensitive insert-or-replace.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Case-insensitive removal.
    pub fn remove(&mut self, name: &str) {
        self.fields.remove(&name.to_ascii_lowercase());
    }

    /// Insert, comma-joining with any existing value under the same name.
    pub fn merge(&mut self, name: &str, value: String) {
        self.fields
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `content-length` as a number, if the header is present.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        match self.get(CONTENT_LENGTH) {
            None => Ok(None),
            Some(v) => v
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength),
        }
    }

    /// Whether these headers select the chunked body framing.
    pub fn is_chunked(&self) -> bool {
        self.get(TRANSFER_ENCODING)
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    }
}

fn find_separator(data: &[u8]) -> Option<usize> {
    data.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
}

/// Splits and validates one `name: value` field line.
///
/// Rejected: missing colon, whitespace between the name and the colon,
/// internal whitespace in the trimmed name, and any character outside the
/// token grammar `[A-Za-z0-9!#$%&'*+\-.^_`|~]`.
fn validate_field_line(line: &str) -> Result<(String, String), ParseError> {
    let (raw_name, raw_value) = line
        .split_once(':')
        .ok_or(ParseError::InvalidHeaderName)?;

    if raw_name.ends_with(' ') || raw_name.ends_with('\t') {
        return Err(ParseError::InvalidHeaderSpacing);
    }

    let name = raw_name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(ParseError::InvalidHeaderSpacing);
    }
    if !name.bytes().all(is_token_byte) {
        return Err(ParseError::InvalidHeaderName);
    }

    Ok((name.to_ascii_lowercase(), raw_value.trim().to_string()))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
                | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}
