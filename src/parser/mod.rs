//! HTTP/1.x request parser.
//!
//! Turns the raw header block read from a connection into an [`HttpRequest`].
//! Request bodies are never read: every route this crate serves is answered
//! from the request line alone.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::{header_block_len, parse_request};
