//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, log_enabled, warn, Level};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::parser::{header_block_len, parse_request, Error as ParserError, HttpRequest, Method};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::h2c;
use crate::server::handler::{RouteMatch, Router};
use crate::server::rewind::Rewind;
use crate::server::response::{HttpResponse, StatusCode};

/// How long shutdown waits for in-flight connections.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// How long a turned-away connection may take to send its request.
const REJECT_DRAIN: Duration = Duration::from_millis(100);

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The route table, fixed for the server's lifetime.
    pub router: Arc<Router>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and route table.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Log the registered endpoints.
    fn display_server_info(&self) {
        info!("Registered endpoints:");
        for route in self.router.routes() {
            let methods = route
                .allowed_methods()
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<String>>()
                .join(", ");
            info!("  {methods} {}", route.path);
        }
    }

    /// Bind the TCP listener on the configured address.
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = listener.local_addr()?);
        Ok(listener)
    }

    /// Bind the configured address and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until Ctrl+C.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        self.serve_with_shutdown(listener, Self::ctrl_c()).await
    }

    /// Resolves once Ctrl+C is received. Never resolves if the handler cannot be installed.
    async fn ctrl_c() {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                error!("Error setting up Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    }

    /// Serve connections from `listener` until `shutdown` resolves, then drain.
    pub async fn serve_with_shutdown<S>(&self, listener: TcpListener, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        // Use JoinSet to keep track of all spawned tasks
        let mut tasks = JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server...");
                    break;
                }

                // Reap finished connections so the set does not grow without bound
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection task failed: {e}");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.handle_new_connection(socket, addr, semaphore.clone(), &mut tasks).await;
                        }
                        Err(e) => {
                            if Self::handle_accept_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Admit a new connection, or turn it away when at capacity.
    async fn handle_new_connection(
        &self,
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        debug!("Connection from: {addr}");

        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                // Off the accept loop: draining may wait on the client
                tokio::spawn(async move {
                    if let Err(e) = Self::reject_connection(&mut socket, REJECT_DRAIN).await {
                        debug!("Could not send 503 to {addr}: {e}");
                    }
                });
                return;
            }
        };

        let router = self.router.clone();
        let read_buffer_size = self.config.read_buffer_size;
        let timeout = self.config.connection_timeout;

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            let result = match tokio::time::timeout(
                timeout,
                Self::handle_connection(&mut socket, &router, read_buffer_size),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(timeout)),
            };

            match result {
                Ok(()) => {}
                Err(e @ Error::IoError(_)) => error!("Error handling connection from {addr}: {e}"),
                Err(e) => warn!("Request from {addr} failed: {e}"),
            }
        });
    }

    /// Answer `503` to a connection over the limit.
    ///
    /// The request is read first, for at most `drain`, so that closing the
    /// socket with unread data does not reset the connection before the
    /// client sees the response.
    pub(crate) async fn reject_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        drain: Duration,
    ) -> Result<(), Error> {
        let mut buf = [0u8; 1024];
        let mut filled = 0;
        let _ = tokio::time::timeout(drain, async {
            while filled < buf.len() {
                match socket.read(&mut buf[filled..]).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => filled += n,
                }
                if header_block_len(&buf[..filled]).is_some() {
                    break;
                }
            }
        })
        .await;

        let response = HttpResponse::text(
            StatusCode::ServiceUnavailable,
            "Server is at capacity, please try again later",
        );
        Self::write_response(socket, response).await
    }

    /// Decide whether an accept error should stop the server.
    async fn handle_accept_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // Usually fd exhaustion; back off before retrying
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Wait for in-flight connections, bounded by [`SHUTDOWN_GRACE`].
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {len} connections still open after {SHUTDOWN_GRACE:?}", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Read until the end of the header block, EOF, or a full buffer.
    async fn read_request_head(
        socket: &mut (impl AsyncRead + Unpin),
        read_buffer_size: usize,
    ) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; read_buffer_size];
        let mut filled = 0;

        loop {
            let n = socket.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;

            if header_block_len(&buf[..filled]).is_some() {
                break;
            }
            if filled == buf.len() {
                return Err(Error::HeadersTooLarge(read_buffer_size));
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    /// The response sent for a request that never reached a handler.
    fn rejection_response(e: &Error) -> Option<HttpResponse> {
        let response = match e {
            Error::ParseError(inner @ ParserError::UnsupportedVersion(_)) => {
                HttpResponse::text(StatusCode::HttpVersionNotSupported, format!("Error parsing request: {inner}"))
            }
            Error::ParseError(inner) => {
                HttpResponse::text(StatusCode::BadRequest, format!("Error parsing request: {inner}"))
            }
            Error::HeadersTooLarge(_) => HttpResponse::text(StatusCode::RequestHeaderFieldsTooLarge, e.to_string()),
            _ => return None,
        };
        Some(response)
    }

    /// Write a complete response and close our side of the connection.
    async fn write_response(
        socket: &mut (impl AsyncWrite + Unpin),
        response: HttpResponse,
    ) -> Result<(), Error> {
        let response = response.with_header("Connection", "close");
        socket.write_all(&response.to_bytes()).await?;
        socket.shutdown().await?;
        Ok(())
    }

    /// Dump the parsed request as JSON when debug logging is on.
    fn log_request(request: &HttpRequest) -> Result<(), Error> {
        if log_enabled!(Level::Debug) {
            debug!("Request {}", serde_json::to_string(request)?);
        }
        Ok(())
    }

    /// Read the rest of a connection preface whose first line has been seen.
    async fn complete_preface(
        socket: &mut (impl AsyncRead + Unpin),
        mut head: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let mut chunk = [0u8; 8];
        while head.len() < h2c::PREFACE.len() {
            let wanted = h2c::PREFACE.len() - head.len();
            let limit = wanted.min(chunk.len());
            let n = socket.read(&mut chunk[..limit]).await?;
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        Ok(head)
    }

    /// Route a parsed request and build its response.
    ///
    /// The error, if any, is what went wrong for logging; the response is
    /// always the one to send.
    pub(crate) async fn dispatch(router: &Router, request: HttpRequest) -> (HttpResponse, Option<Error>) {
        match router.lookup(request.method, request.path_only()) {
            RouteMatch::Found(route) => {
                let is_head = request.method == Method::HEAD;

                match (route.handler)(request).await {
                    Ok(response) if is_head => (response.without_body(), None),
                    Ok(response) => (response, None),
                    Err(e) => {
                        let response = HttpResponse::text(
                            StatusCode::InternalServerError,
                            format!("Internal server error: {e}"),
                        );
                        (response, Some(e))
                    }
                }
            }
            RouteMatch::MethodNotAllowed(allowed) => {
                let allowed = allowed.iter().map(|m| m.to_string()).collect::<Vec<String>>().join(", ");

                let response = HttpResponse::text(
                    StatusCode::MethodNotAllowed,
                    format!(
                        "Method {method} not allowed for path: {path}. Allowed methods: {allowed}",
                        method = request.method,
                        path = request.path_only(),
                    ),
                )
                .with_header("Allow", allowed);

                (response, Some(Error::MethodNotAllowed(request.method, request.path)))
            }
            RouteMatch::NotFound => {
                let response = HttpResponse::text(
                    StatusCode::NotFound,
                    format!("Not found: {path}", path = request.path_only()),
                );
                (response, Some(Error::NotFound(request.path)))
            }
        }
    }

    /// Handle a single connection.
    ///
    /// HTTP/1 connections carry one request and one response. A connection
    /// opening with the HTTP/2 preface is served as h2c until the client
    /// closes it.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: &Router,
        read_buffer_size: usize,
    ) -> Result<(), Error> {
        let mut head = match Self::read_request_head(socket, read_buffer_size).await {
            Ok(head) => head,
            Err(e) => {
                if let Some(response) = Self::rejection_response(&e) {
                    Self::write_response(socket, response).await?;
                }
                return Err(e);
            }
        };

        if head.is_empty() {
            return Ok(()); // Connection closed
        }

        if head.starts_with(h2c::PREFACE_HEAD) {
            head = Self::complete_preface(socket, head).await?;
            if head.starts_with(h2c::PREFACE) {
                return h2c::serve(Rewind::new(head, socket), router).await;
            }
            // Anything else after `PRI * HTTP/2.0` fails below as an unsupported version
        }

        let request = match parse_request(&head) {
            Ok(req) => req,
            Err(e) => {
                let e = Error::ParseError(e);
                if let Some(response) = Self::rejection_response(&e) {
                    Self::write_response(socket, response).await?;
                }
                return Err(e);
            }
        };

        Self::log_request(&request)?;

        let (response, failure) = Self::dispatch(router, request).await;
        Self::write_response(socket, response).await?;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
