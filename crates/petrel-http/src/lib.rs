//! # Petrel HTTP
//!
//! Minimal HTTP/1.1 client for the Petrel pipeline.
//!
//! The response side is an incremental, character-driven state machine
//! ([`ResponseParser`]) that can be fed network data in arbitrary slices:
//! status line, headers, then a body sub-parser (chunked transfer encoding
//! or identity). The request side serializes a configuration object into
//! request text and drives one exchange over a tokio stream. One request,
//! one response, no redirects, no retries, no timeouts.

pub mod parser;
pub mod request;
pub mod response;

pub use parser::{ChunkedBodyParser, IdentityBodyParser, ResponseParser};
pub use request::RequestOptions;
pub use response::Response;

use thiserror::Error;

/// HTTP client errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed chunk size: {0}")]
    MalformedChunkSize(String),

    #[error("Connection closed before the response completed")]
    TruncatedResponse,
}
