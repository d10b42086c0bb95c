//! HTTP/2 over cleartext with prior knowledge.
//!
//! Each stream on the connection is turned into an [`HttpRequest`] and sent
//! through the same [`Router`] as HTTP/1 requests.

use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;
use h2::server::SendResponse;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::parser::{Error as ParserError, HttpRequest, HttpVersion, Method};
use crate::server::error::Error;
use crate::server::handler::Router;
use crate::server::http_server::HttpServer;
use crate::server::response::{HttpResponse, StatusCode};

/// The client connection preface (RFC 9113, section 3.4).
pub(crate) const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// The part of the preface that reads like an HTTP/1 request head.
pub(crate) const PREFACE_HEAD: &[u8] = b"PRI * HTTP/2.0\r\n\r\n";

/// Serve every stream of an h2c connection until the client goes away.
///
/// `io` must yield the full connection preface first.
pub(crate) async fn serve<T>(io: T, router: &Router) -> Result<(), Error>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = h2::server::handshake(io).await?;
    debug!("HTTP/2 connection established");

    while let Some(accepted) = connection.accept().await {
        let (request, respond) = accepted?;

        let response = match to_request(&request) {
            Ok(request) => {
                let (response, failure) = HttpServer::dispatch(router, request).await;
                if let Some(e) = failure {
                    warn!("HTTP/2 request failed: {e}");
                }
                response
            }
            Err(e) => {
                warn!("Rejecting HTTP/2 request: {e}");
                HttpResponse::text(StatusCode::BadRequest, format!("Error parsing request: {e}"))
            }
        };

        // A reset stream must not take the other streams down with it
        if let Err(e) = send(respond, response) {
            warn!("Could not send HTTP/2 response: {e}");
        }
    }

    Ok(())
}

/// Build an [`HttpRequest`] from the pseudo-headers and headers of a stream.
pub(crate) fn to_request<B>(request: &http::Request<B>) -> Result<HttpRequest, ParserError> {
    let method = Method::from_str(request.method().as_str())?;

    let path = match request.uri().path_and_query().map(|pq| pq.as_str()) {
        Some("") | None => "/",
        Some(path) => path,
    };
    if !path.starts_with('/') {
        return Err(ParserError::InvalidPath(path.to_string()));
    }

    let mut headers = HashMap::new();
    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_string(), value.to_string());
        }
    }
    if let Some(authority) = request.uri().authority() {
        headers.entry("host".to_string()).or_insert_with(|| authority.to_string());
    }

    Ok(HttpRequest::new(method, path.to_string(), HttpVersion::Http20, headers))
}

/// Convert a response into HTTP/2 headers, dropping connection-specific fields.
pub(crate) fn to_h2_response(response: &HttpResponse) -> Result<http::Response<()>, Error> {
    let mut builder = http::Response::builder().status(response.status.as_u16());
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("Connection") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(())
        .map_err(|e| Error::InternalError(format!("building HTTP/2 response: {e}")))
}

fn send(mut respond: SendResponse<Bytes>, response: HttpResponse) -> Result<(), Error> {
    let head = to_h2_response(&response)?;
    let end_of_stream = response.body.is_empty();

    let mut stream = respond.send_response(head, end_of_stream)?;
    if !end_of_stream {
        stream.send_data(Bytes::from(response.body), true)?;
    }
    Ok(())
}
