//! HTTP server for pathecho.
//!
//! Task-per-connection listener on top of tokio, dispatching parsed requests
//! through an immutable [`Router`].

mod response;
mod config;
mod error;
mod handler;
mod http_server;
mod h2c;
mod rewind;

// Re-export public items
pub use response::{HttpResponse, StatusCode, SERVER_NAME};
pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::Error;
pub use handler::{HandlerFn, HandlerFuture, Route, RouteMatch, Router};
pub use http_server::HttpServer;
