//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::server::error::Error;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8080;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size, which also bounds the request header block.
    pub read_buffer_size: usize,
    /// How long a single connection may take from accept to response.
    pub connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1024,
            read_buffer_size: 8192,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from the process environment.
    ///
    /// The listening port comes from `PORT`; everything else keeps its default.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            let port = raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::InvalidConfig(format!("PORT={raw:?}: {e}")))?;
            config.addr.set_port(port);
        }

        Ok(config)
    }
}
