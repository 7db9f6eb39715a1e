//! httpwire - HTTP/1.1 straight from TCP
//!
//! Incremental request parsing and strictly-ordered response serialization
//! on a raw byte stream, plus the server loop that drives one request and
//! one response per connection.

pub mod config;
pub mod http;
pub mod server;
pub mod upstream;
