//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Method not allowed for the requested resource.
    #[error("Method {0} not allowed for path: {1}")]
    MethodNotAllowed(Method, String),

    /// The header block did not fit in the read buffer.
    #[error("Request header block exceeds {0} bytes")]
    HeadersTooLarge(usize),

    /// The client did not finish its request in time.
    #[error("Connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A configuration value could not be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// HTTP/2 framing or connection error.
    #[error("HTTP/2 error: {0}")]
    Http2(#[from] h2::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
