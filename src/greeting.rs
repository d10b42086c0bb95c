//! The greeting handler.
//!
//! Answers every request with its own path, query string included, and the
//! HTTP version it arrived over, and writes the same line to the log.

use log::info;

use crate::parser::{HttpRequest, Method};
use crate::server::{Error, HttpResponse, Router, StatusCode};

/// Log target of the greeting line, so the sink can print it bare.
pub const LOG_TARGET: &str = "pathecho::greeting";

/// Build the greeting for a request.
pub fn greeting(request: &HttpRequest) -> String {
    format!(
        "Hello, {path}; HTTP Version: {version}.",
        path = request.path_and_query(),
        version = request.version.as_number(),
    )
}

/// Route handler: respond with the greeting and log it. Never fails.
///
/// `HEAD` requests get the same headers but are not logged, since no
/// greeting is sent back.
pub async fn hello(request: HttpRequest) -> Result<HttpResponse, Error> {
    let message = greeting(&request);
    if request.method != Method::HEAD {
        info!(target: LOG_TARGET, "{message}");
    }
    Ok(HttpResponse::text(StatusCode::Ok, message))
}

/// The route table: `GET /*` to [`hello`].
pub fn router() -> Router {
    Router::new().route("/*", vec![Method::GET], hello)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Mutex, Once};

    use log::{Log, Metadata, Record};

    use super::*;
    use crate::parser::{parse_request, HttpVersion};

    /// Records greeting log lines so tests can count them.
    struct CaptureLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if record.target() == LOG_TARGET {
                self.lines.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger { lines: Mutex::new(Vec::new()) };
    static INIT: Once = Once::new();

    fn captured(line: &str) -> usize {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
        LOGGER.lines.lock().unwrap().iter().filter(|l| *l == line).count()
    }

    fn request(path: &str, version: HttpVersion) -> HttpRequest {
        HttpRequest::new(Method::GET, path.to_string(), version, HashMap::new())
    }

    #[test]
    fn test_greeting_root() {
        let req = request("/", HttpVersion::Http11);
        assert_eq!(greeting(&req), "Hello, /; HTTP Version: 1.1.");
    }

    #[test]
    fn test_greeting_with_query() {
        let req = request("/search?q=test", HttpVersion::Http11);
        assert_eq!(greeting(&req), "Hello, /search?q=test; HTTP Version: 1.1.");
    }

    #[test]
    fn test_greeting_http10() {
        let req = parse_request(b"GET /a/b?x=1 HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(greeting(&req), "Hello, /a/b?x=1; HTTP Version: 1.0.");
    }

    #[tokio::test]
    async fn test_hello_response() {
        let response = hello(request("/hello-response", HttpVersion::Http11)).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, b"Hello, /hello-response; HTTP Version: 1.1.");
        assert!(response.headers["Content-Type"].starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_hello_is_idempotent() {
        let first = hello(request("/same?again=1", HttpVersion::Http10)).await.unwrap();
        let second = hello(request("/same?again=1", HttpVersion::Http10)).await.unwrap();
        assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[tokio::test]
    async fn test_hello_logs_exactly_one_line() {
        let expected = "Hello, /logged/once?id=7; HTTP Version: 1.1.";
        let before = captured(expected);

        let response = hello(request("/logged/once?id=7", HttpVersion::Http11)).await.unwrap();

        assert_eq!(response.body, expected.as_bytes());
        assert_eq!(captured(expected) - before, 1);
    }

    #[test]
    fn test_greeting_http2() {
        let req = request("/h2?x=1", HttpVersion::Http20);
        assert_eq!(greeting(&req), "Hello, /h2?x=1; HTTP Version: 2.");
    }

    #[tokio::test]
    async fn test_head_is_not_logged() {
        let expected = "Hello, /head/quiet; HTTP Version: 1.1.";
        let before = captured(expected);

        let head = HttpRequest::new(Method::HEAD, "/head/quiet".to_string(), HttpVersion::Http11, HashMap::new());
        let response = hello(head).await.unwrap();

        assert_eq!(response.headers["Content-Length"], expected.len().to_string());
        assert_eq!(captured(expected), before);
    }

    #[test]
    fn test_router_matches_every_path() {
        let router = router();
        for path in ["/", "/a", "/a/b/c", "/search"] {
            assert!(matches!(router.lookup(Method::GET, path), crate::server::RouteMatch::Found(_)), "{path}");
        }
        assert!(matches!(
            router.lookup(Method::POST, "/"),
            crate::server::RouteMatch::MethodNotAllowed(_)
        ));
    }
}
