//! End-to-end tests of the greeting server over real TCP connections.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use pathecho::{greeting, HttpServer, ServerConfig};

async fn start_server() -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = HttpServer::new(ServerConfig::default(), greeting::router());
    tokio::spawn(async move {
        server
            .serve_with_shutdown(listener, async {
                let _ = rx.await;
            })
            .await
    });

    (addr, tx)
}

async fn send(addr: SocketAddr, request: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

fn split(response: &str) -> (&str, &str) {
    let (head, body) = response.split_once("\r\n\r\n").expect("response has a header block");
    let status_line = head.lines().next().unwrap_or_default();
    (status_line, body)
}

#[tokio::test]
async fn test_paths_and_versions() {
    let (addr, _shutdown) = start_server().await;

    let paths = ["/", "/a/b?x=1", "/search?q=test", "/deep/nested/path/", "/q?a=1&b=&c"];
    let versions = [("1.0", ""), ("1.1", "Host: localhost\r\n")];

    for path in paths {
        for (version, host) in versions {
            let request = format!("GET {path} HTTP/{version}\r\n{host}\r\n");
            let response = send(addr, request).await;
            let (status, body) = split(&response);

            assert_eq!(status, "HTTP/1.1 200 OK");
            assert_eq!(body, format!("Hello, {path}; HTTP Version: {version}."));
        }
    }
}

#[tokio::test]
async fn test_absolute_form_without_path() {
    let (addr, _shutdown) = start_server().await;

    let response = send(addr, "GET http://localhost HTTP/1.1\r\nHost: localhost\r\n\r\n".to_string()).await;
    let (status, body) = split(&response);

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(body, "Hello, /; HTTP Version: 1.1.");
}

#[tokio::test]
async fn test_repeated_request_is_byte_identical() {
    let (addr, _shutdown) = start_server().await;
    let request = "GET /repeat?me=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";

    let first = send(addr, request.to_string()).await;
    let second = send(addr, request.to_string()).await;

    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_not_mixed_up() {
    let (addr, _shutdown) = start_server().await;

    let mut handles = Vec::new();
    for i in 0..64 {
        handles.push(tokio::spawn(async move {
            let path = format!("/client/{i}?n={i}");
            let response = send(addr, format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n")).await;
            (path, response)
        }));
    }

    for handle in handles {
        let (path, response) = handle.await.unwrap();
        let (status, body) = split(&response);
        assert_eq!(status, "HTTP/1.1 200 OK");
        assert_eq!(body, format!("Hello, {path}; HTTP Version: 1.1."));
    }
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let (addr, _shutdown) = start_server().await;

    for method in ["POST", "PUT", "DELETE", "OPTIONS"] {
        let response = send(addr, format!("{method} /x HTTP/1.1\r\nHost: localhost\r\n\r\n")).await;
        let (status, _) = split(&response);
        assert_eq!(status, "HTTP/1.1 405 Method Not Allowed", "{method}");
        assert!(response.contains("Allow: GET, HEAD\r\n"));
    }
}

#[tokio::test]
async fn test_bare_lf_request_is_answered() {
    let (addr, _shutdown) = start_server().await;

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        send(addr, "GET /lf HTTP/1.0\n\n".to_string()),
    )
    .await
    .expect("answered before the connection timeout");
    let (status, body) = split(&response);

    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(body, "Hello, /lf; HTTP Version: 1.0.");
}

async fn h2_get(client: h2::client::SendRequest<bytes::Bytes>, path: &str) -> (http::StatusCode, String) {
    let mut client = client.ready().await.unwrap();
    let request = http::Request::builder()
        .method("GET")
        .uri(format!("http://localhost{path}"))
        .body(())
        .unwrap();

    let (response, _) = client.send_request(request, true).unwrap();
    let response = response.await.unwrap();
    let status = response.status();
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));

    let mut body = response.into_body();
    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.unwrap();
        let _ = body.flow_control().release_capacity(chunk.len());
        bytes.extend_from_slice(&chunk);
    }

    (status, String::from_utf8(bytes).unwrap())
}

#[tokio::test]
async fn test_h2c_prior_knowledge() {
    let (addr, _shutdown) = start_server().await;

    let tcp = TcpStream::connect(addr).await.unwrap();
    let (client, connection) = h2::client::handshake(tcp).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });

    // Two streams on the same connection
    let (first, second) = tokio::join!(h2_get(client.clone(), "/h2/path?x=1"), h2_get(client.clone(), "/"));

    assert_eq!(first, (http::StatusCode::OK, "Hello, /h2/path?x=1; HTTP Version: 2.".to_string()));
    assert_eq!(second, (http::StatusCode::OK, "Hello, /; HTTP Version: 2.".to_string()));
}

#[tokio::test]
async fn test_h2c_other_methods_are_rejected() {
    let (addr, _shutdown) = start_server().await;

    let tcp = TcpStream::connect(addr).await.unwrap();
    let (client, connection) = h2::client::handshake(tcp).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });

    let mut client = client.ready().await.unwrap();
    let request = http::Request::builder()
        .method("DELETE")
        .uri("http://localhost/thing")
        .body(())
        .unwrap();
    let (response, _) = client.send_request(request, true).unwrap();
    let response = response.await.unwrap();

    assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET, HEAD");
}
