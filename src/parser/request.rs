//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The path and query, exactly as sent in origin-form
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The request path, including any query string
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        Self {
            method,
            path,
            version,
            headers,
        }
    }

    /// The request target with its query string, never empty.
    pub fn path_and_query(&self) -> &str {
        &self.path
    }

    /// The request target without its query string.
    pub fn path_only(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// The header value, if it exists
    pub fn get_header(&self, name: &str) -> Option<&String> {
        // Headers are case-insensitive, so we need to do a case-insensitive lookup
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }
}

/// Reduce a request target to its path and query.
///
/// Origin-form targets are returned verbatim. Absolute-form targets lose
/// their scheme and authority; an empty path becomes `/`.
fn normalize_target(target: &str) -> Result<String, Error> {
    if target.starts_with('/') {
        return Ok(target.to_string());
    }

    let rest = ["http://", "https://"].iter().find_map(|scheme| {
        let prefix = target.get(..scheme.len())?;
        prefix.eq_ignore_ascii_case(scheme).then(|| &target[scheme.len()..])
    });

    let Some(rest) = rest else {
        return Err(Error::InvalidPath(target.to_string()));
    };

    match rest.find(['/', '?']) {
        Some(idx) if rest[idx..].starts_with('/') => Ok(rest[idx..].to_string()),
        Some(idx) => Ok(format!("/{}", &rest[idx..])),
        None => Ok("/".to_string()),
    }
}

/// Length of the header block including its terminating blank line, if the
/// terminator has been seen.
///
/// A blank line is `\r\n` or a bare `\n`, matching what [`str::lines`]
/// accepts when the block is parsed.
pub fn header_block_len(input: &[u8]) -> Option<usize> {
    input.iter().enumerate().find_map(|(i, &byte)| {
        if byte != b'\n' {
            return None;
        }
        match &input[i + 1..] {
            [b'\n', ..] => Some(i + 2),
            [b'\r', b'\n', ..] => Some(i + 3),
            _ => None,
        }
    })
}

/// Parse the version token, separating unsupported protocol versions from
/// tokens that are not versions at all.
fn parse_version(token: &str) -> Result<HttpVersion, Error> {
    match HttpVersion::from_str(token) {
        Ok(version) if version.is_supported() => Ok(version),
        Ok(_) => Err(Error::UnsupportedVersion(token.to_string())),
        Err(_) if token.starts_with("HTTP/") => Err(Error::UnsupportedVersion(token.to_string())),
        Err(e) => Err(e),
    }
}

/// Parse an HTTP request from a byte slice.
///
/// Only the request line and header block are examined; anything after the
/// blank line is ignored.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    // Bodies are never examined, so only the header block has to be valid UTF-8
    let head = match header_block_len(input) {
        Some(len) => &input[..len],
        None => input,
    };

    let input_str = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = input_str.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    // The version decides whether the rest of the request is worth reading
    let version = parse_version(parts[2])?;

    let path = normalize_target(parts[1])?;

    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => (name.trim(), value.trim()),
            _ => return Err(Error::InvalidHeaderFormat(line.to_string())),
        };

        // More than one Host field makes the target ambiguous
        if name.eq_ignore_ascii_case("Host") && headers.keys().any(|k: &String| k.eq_ignore_ascii_case("Host")) {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        }

        headers.insert(name.to_string(), value.to_string());
    }

    let request = HttpRequest::new(method, path, version, headers);

    if version == HttpVersion::Http11 && !request.has_header("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    Ok(request)
}
