//! Configuration-time builder for a [`BindingTable`].
//!
//! Bind everything, then call [`Router::build`]. The table it returns is
//! immutable, so "all bindings exist before the first request" holds by
//! construction. Each bind call returns `self` so registrations chain; a
//! rejected binding is logged the moment it is attempted and the first one
//! is returned from `build`.

use tracing::warn;

use crate::binding::{Binding, BindingTable, EndpointBinding, MiddlewareBinding};
use crate::error::ConfigError;
use crate::handler::{Handler, Route};
use crate::method::Method;
use crate::middleware::Middleware;
use crate::response::IntoResponse;

/// The application router.
///
/// `D` is the per-request data type every handler finds in its
/// [`Context`](crate::Context).
///
/// ```rust
/// use waypost::{BoxFuture, Context, Method, Next, Request, Response, Router};
/// use http::StatusCode;
///
/// fn auth<'a>(req: &'a Request, _cx: &'a mut Context) -> BoxFuture<'a, Next> {
///     Box::pin(async move {
///         if req.header("authorization").is_some() { Next::Continue } else { Next::fail("auth failed") }
///     })
/// }
///
/// fn unauthorized<'a>(_req: &'a Request, _cx: &'a mut Context) -> BoxFuture<'a, StatusCode> {
///     Box::pin(async { StatusCode::UNAUTHORIZED })
/// }
///
/// let table = Router::new()
///     .middleware("/", auth)
///     .error_middleware("/", unauthorized)
///     .on_static(Method::Get, "/", Response::json(r#"{"msg":"ok"}"#))
///     .build()
///     .unwrap();
/// assert!(table.has_endpoint("/"));
/// ```
pub struct Router<D = ()> {
    table: BindingTable<D>,
    error: Option<ConfigError>,
}

impl<D: 'static> Router<D> {
    pub fn new() -> Self {
        Self { table: BindingTable::new(), error: None }
    }

    /// Binds a route for one method at an exact path.
    ///
    /// The first binding for a path creates its endpoint; later ones fill or
    /// overwrite single method slots. All slots of a path must be of the same
    /// kind, static or dynamic.
    pub fn route(self, method: Method, path: &str, route: Route<D>) -> Self {
        self.bind(Binding::Endpoint(EndpointBinding::new(path, method, route)))
    }

    /// Binds a handler for a method + path pair.
    pub fn on<R>(self, method: Method, path: &str, handler: impl Handler<D, R>) -> Self {
        self.route(method, path, Route::handler(handler))
    }

    /// Binds a precomputed response, returned unchanged to every request.
    pub fn on_static(self, method: Method, path: &str, response: impl IntoResponse) -> Self {
        self.route(method, path, Route::fixed(response))
    }

    pub fn get<R>(self, path: &str, handler: impl Handler<D, R>) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post<R>(self, path: &str, handler: impl Handler<D, R>) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn patch<R>(self, path: &str, handler: impl Handler<D, R>) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete<R>(self, path: &str, handler: impl Handler<D, R>) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Binds a middleware to `path`, or to every path when `path` is `"/"`.
    ///
    /// It runs for endpoints registered after it, in registration order.
    /// Binding it after `path`'s own endpoint is a configuration error.
    pub fn middleware<R>(self, path: &str, middleware: impl Middleware<D, R>) -> Self {
        self.bind_middleware(path, middleware, false)
    }

    /// Binds an error middleware, run only after a middleware fails.
    pub fn error_middleware<R>(self, path: &str, middleware: impl Middleware<D, R>) -> Self {
        self.bind_middleware(path, middleware, true)
    }

    pub fn bind_middleware<R>(
        self,
        path: &str,
        middleware: impl Middleware<D, R>,
        is_error_middleware: bool,
    ) -> Self {
        let binding = MiddlewareBinding::new(path, middleware.into_boxed_middleware());
        self.bind(if is_error_middleware {
            Binding::ErrorMiddleware(binding)
        } else {
            Binding::Middleware(binding)
        })
    }

    /// Finishes configuration.
    ///
    /// Fails with the first binding that was rejected.
    pub fn build(self) -> Result<BindingTable<D>, ConfigError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.table),
        }
    }

    fn bind(mut self, binding: Binding<D>) -> Self {
        if let Err(err) = self.table.register(binding) {
            warn!(error = %err, "binding rejected");
            self.error.get_or_insert(err);
        }
        self
    }
}

impl<D: 'static> Default for Router<D> {
    fn default() -> Self { Self::new() }
}
