//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur during HTTP request parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not recognised.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is neither origin-form nor absolute-form.
    #[error("Invalid request target: {0}")]
    InvalidPath(String),

    /// The request line is malformed (wrong format or missing components).
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The version token is not an HTTP version at all.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// The request names an HTTP version this listener does not serve.
    #[error("Unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header line has no `name: value` shape.
    #[error("Invalid header format: {0}")]
    InvalidHeaderFormat(String),

    /// The request is empty.
    #[error("Empty request")]
    EmptyRequest,
}
