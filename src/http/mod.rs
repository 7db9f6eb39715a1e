//! HTTP/1.1 message parsing and serialization, straight off the byte
//! stream.
//!
//! No HTTP library underneath: requests are parsed incrementally as bytes
//! arrive and responses are serialized section by section through a state
//! machine that refuses out-of-order writes.
//!
//! # Submodules
//!
//! - **`headers`**: case-insensitive header map with line-at-a-time parsing
//! - **`request`**: resumable request parser and the buffer-driving read loop
//! - **`response`**: status codes and status-line formatting
//! - **`writer`**: the strictly-ordered response writer
//!
//! # Parse states
//!
//! ```text
//! Initialized → Headers → Body → Done
//!                   └────────────↗ (no content-length)
//! ```
//!
//! # Write states
//!
//! ```text
//! Initialized → StatusLine → Headers → Body                      (fixed length)
//!                      └→ ChunkedBody → ChunkedBodyDone → Trailers → Done
//!                           (selected by transfer-encoding: chunked)
//! ```
//!
//! Any write failure latches the writer in an `Error` state for the rest of
//! the connection.

pub mod headers;
pub mod request;
pub mod response;
pub mod writer;

pub use headers::HeaderMap;
pub use request::{Request, RequestLine, request_from_reader};
pub use response::StatusCode;
pub use writer::{ResponseWriter, WriteError, WriteState};
