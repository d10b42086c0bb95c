//! pathecho: an HTTP server that tells callers what they asked for.
//!
//! Every `GET` request is answered with `Hello, {path_and_query}; HTTP Version: {version}.`
//! in plain text, and the same line is written to the log. HTTP/1.0 and
//! HTTP/1.1 are served, as is HTTP/2 over cleartext for clients that open the
//! connection with the HTTP/2 preface.
//!
//! # Example
//!
//! ```no_run
//! use pathecho::{greeting, HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), pathecho::ServerError> {
//! let server = HttpServer::new(ServerConfig::from_env()?, greeting::router());
//! server.start().await
//! # }
//! ```
//!
//! The parser is usable on its own:
//!
//! ```
//! use pathecho::{parse_request, HttpVersion};
//!
//! let request = parse_request(b"GET /search?q=test HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! assert_eq!(request.path_and_query(), "/search?q=test");
//! assert_eq!(request.version, HttpVersion::Http11);
//! assert_eq!(
//!     pathecho::greeting::greeting(&request),
//!     "Hello, /search?q=test; HTTP Version: 1.1."
//! );
//! ```

pub mod greeting;
pub mod parser;
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use server::{Error as ServerError, HttpResponse, HttpServer, Router, ServerConfig, StatusCode};
