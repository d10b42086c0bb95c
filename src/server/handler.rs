//! Request handlers and the route table.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::{Error, HttpResponse};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns a HandlerFuture.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Represents a route in the HTTP server.
#[derive(Clone)]
pub struct Route {
    /// The path pattern: an exact path, or a prefix ending in `/*`.
    pub path: String,
    /// The HTTP methods to match.
    pub methods: Vec<Method>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Route {
    /// Whether this route's pattern covers `path` (query string excluded).
    ///
    /// `/*` matches every path; `/api/*` matches `/api` and everything below it.
    pub fn matches_path(&self, path: &str) -> bool {
        match self.path.strip_suffix("/*") {
            Some(prefix) => {
                path.strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
            None => self.path == path,
        }
    }

    /// Whether this route accepts `method`. HEAD rides along with GET.
    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
            || (method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    /// Methods advertised in an `Allow` header.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = self.methods.clone();
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods
    }
}

/// The outcome of looking a request up in the route table.
pub enum RouteMatch<'a> {
    /// A route covers both the path and the method.
    Found(&'a Route),
    /// Routes cover the path, but none accepts the method.
    MethodNotAllowed(Vec<Method>),
    /// No route covers the path.
    NotFound,
}

/// An immutable route table, built once before the server starts.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `methods` on `path`.
    pub fn route<F, Fut>(mut self, path: impl Into<String>, methods: Vec<Method>, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |req: HttpRequest| -> HandlerFuture {
            Box::pin(handler(req))
        });

        self.routes.push(Route {
            path: path.into(),
            methods,
            handler,
        });
        self
    }

    /// The registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for a request. Earlier registrations win.
    pub fn lookup(&self, method: Method, path: &str) -> RouteMatch<'_> {
        let matching: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.matches_path(path))
            .collect();

        if matching.is_empty() {
            return RouteMatch::NotFound;
        }

        match matching.iter().find(|route| route.allows(method)) {
            Some(route) => RouteMatch::Found(route),
            None => {
                let mut allowed = Vec::new();
                for method in matching.iter().flat_map(|route| route.allowed_methods()) {
                    if !allowed.contains(&method) {
                        allowed.push(method);
                    }
                }
                RouteMatch::MethodNotAllowed(allowed)
            }
        }
    }
}
