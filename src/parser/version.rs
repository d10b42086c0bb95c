//! HTTP protocol versions.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::parser::error::Error;

/// HTTP protocol versions that can appear on a request line.
///
/// Only the 1.x versions can appear on an HTTP/1 request line. `Http20`
/// requests arrive over h2c and are built from HTTP/2 frames instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http20,
}

impl HttpVersion {
    /// The bare version number, e.g. `"1.1"` or `"2"`.
    pub fn as_number(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "1.0",
            HttpVersion::Http11 => "1.1",
            HttpVersion::Http20 => "2",
        }
    }

    /// Whether a request line with this version can be answered in HTTP/1 framing.
    pub fn is_supported(&self) -> bool {
        matches!(self, HttpVersion::Http10 | HttpVersion::Http11)
    }
}

impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(HttpVersion::Http10),
            "HTTP/1.1" => Ok(HttpVersion::Http11),
            "HTTP/2" | "HTTP/2.0" => Ok(HttpVersion::Http20),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.as_number())
    }
}
