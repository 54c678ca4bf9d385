//! The binding table: every endpoint and middleware, in registration order.
//!
//! Registration order matters twice. Middleware run in the order they were
//! registered, and a middleware only applies to an endpoint registered
//! *after* it. Both fall out of keeping endpoints and middleware in one
//! ordered vector and indexing endpoints by their position in it.
//!
//! Error middleware live in a separate ordered vector and are not subject to
//! the ordering rule.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ConfigError;
use crate::handler::{BoxedHandler, Route, RouteKind};
use crate::method::Method;
use crate::middleware::BoxedMiddleware;
use crate::response::Response;

/// The reserved path whose middleware apply to every path.
pub const ROOT: &str = "/";

// ── Bindings ──────────────────────────────────────────────────────────────────

pub(crate) enum Binding<D> {
    Endpoint(EndpointBinding<D>),
    Middleware(MiddlewareBinding<D>),
    ErrorMiddleware(MiddlewareBinding<D>),
}

impl<D> Binding<D> {
    fn path(&self) -> &str {
        match self {
            Self::Endpoint(b) => &b.path,
            Self::Middleware(b) | Self::ErrorMiddleware(b) => &b.path,
        }
    }
}

/// A path's method slots. Either every bound slot is a static response or
/// every bound slot is a handler; the enum makes mixing unrepresentable.
enum Slots<D> {
    Static([Option<Response>; 4]),
    Dynamic([Option<BoxedHandler<D>>; 4]),
}

/// All methods bound at one exact path.
pub(crate) struct EndpointBinding<D> {
    path: String,
    slots: Slots<D>,
}

/// What the endpoint answers one method with.
pub(crate) enum Resolved<'t, D> {
    Static(&'t Response),
    Dynamic(&'t BoxedHandler<D>),
    Unsupported,
}

impl<D> EndpointBinding<D> {
    pub(crate) fn new(path: impl Into<String>, method: Method, route: Route<D>) -> Self {
        let slots = match route {
            Route::Static(res) => {
                let mut slots: [Option<Response>; 4] = Default::default();
                slots[method.slot()] = Some(res);
                Slots::Static(slots)
            }
            Route::Dynamic(handler) => {
                let mut slots: [Option<BoxedHandler<D>>; 4] = Default::default();
                slots[method.slot()] = Some(handler);
                Slots::Dynamic(slots)
            }
        };
        Self { path: path.into(), slots }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn kind(&self) -> RouteKind {
        match self.slots {
            Slots::Static(_)  => RouteKind::Static,
            Slots::Dynamic(_) => RouteKind::Dynamic,
        }
    }

    /// Overwrites one method slot. The route must match the binding's kind.
    pub(crate) fn set_method(&mut self, method: Method, route: Route<D>) -> Result<(), ConfigError> {
        let existing = self.kind();
        match (&mut self.slots, route) {
            (Slots::Static(slots), Route::Static(res)) => {
                slots[method.slot()] = Some(res);
                Ok(())
            }
            (Slots::Dynamic(slots), Route::Dynamic(handler)) => {
                slots[method.slot()] = Some(handler);
                Ok(())
            }
            (_, route) => Err(ConfigError::MixedHandlerKinds {
                path: self.path.clone(),
                method,
                existing,
                attempted: route.kind(),
            }),
        }
    }

    pub(crate) fn resolve(&self, method: Method) -> Resolved<'_, D> {
        let resolved = match &self.slots {
            Slots::Static(slots)  => slots[method.slot()].as_ref().map(Resolved::Static),
            Slots::Dynamic(slots) => slots[method.slot()].as_ref().map(Resolved::Dynamic),
        };
        resolved.unwrap_or(Resolved::Unsupported)
    }

    /// Bound slots, as `(method, route)` pairs, for merging a second
    /// registration of the same path into this one.
    fn into_routes(self) -> Vec<(Method, Route<D>)> {
        match self.slots {
            Slots::Static(slots) => Method::ALL.into_iter()
                .zip(slots)
                .filter_map(|(m, res)| res.map(|res| (m, Route::Static(res))))
                .collect(),
            Slots::Dynamic(slots) => Method::ALL.into_iter()
                .zip(slots)
                .filter_map(|(m, h)| h.map(|h| (m, Route::Dynamic(h))))
                .collect(),
        }
    }
}

/// A middleware or error middleware bound to a path.
pub(crate) struct MiddlewareBinding<D> {
    path: String,
    handler: BoxedMiddleware<D>,
}

impl<D> MiddlewareBinding<D> {
    pub(crate) fn new(path: impl Into<String>, handler: BoxedMiddleware<D>) -> Self {
        Self { path: path.into(), handler }
    }

    pub(crate) fn handler(&self) -> &BoxedMiddleware<D> {
        &self.handler
    }

    fn applies_to(&self, path: &str) -> bool {
        self.path == ROOT || self.path == path
    }
}

// ── BindingTable ──────────────────────────────────────────────────────────────

/// Every binding of an application, frozen.
///
/// Obtained from [`Router::build`](crate::Router::build) once configuration
/// is complete. The table has no public mutators, so nothing can change the
/// bindings while requests are being dispatched against it.
pub struct BindingTable<D = ()> {
    bindings: Vec<Binding<D>>,
    endpoints: HashMap<String, usize>,
    error_middleware: Vec<MiddlewareBinding<D>>,
}

impl<D> BindingTable<D> {
    pub(crate) fn new() -> Self {
        Self {
            bindings: Vec::new(),
            endpoints: HashMap::new(),
            error_middleware: Vec::new(),
        }
    }

    /// Appends a binding to the ordered store.
    ///
    /// A second endpoint for a path that already has one is merged into the
    /// existing binding slot by slot, keeping the original position.
    pub(crate) fn register(&mut self, binding: Binding<D>) -> Result<(), ConfigError> {
        let path = binding.path();
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath { path: path.to_owned() });
        }

        match binding {
            Binding::Endpoint(endpoint) => {
                if let Some(existing) = self.endpoint_mut(&endpoint.path) {
                    // All slots of one binding share a kind, so a mismatch
                    // fails on the first slot before anything is merged.
                    for (method, route) in endpoint.into_routes() {
                        existing.set_method(method, route)?;
                    }
                    return Ok(());
                }
                debug!(path = %endpoint.path, kind = %endpoint.kind(), "endpoint bound");
                self.endpoints.insert(endpoint.path.clone(), self.bindings.len());
                self.bindings.push(Binding::Endpoint(endpoint));
            }
            Binding::Middleware(mw) => {
                if self.endpoints.contains_key(&mw.path) {
                    return Err(ConfigError::MiddlewareAfterEndpoint { path: mw.path });
                }
                debug!(path = %mw.path, position = self.bindings.len(), "middleware bound");
                self.bindings.push(Binding::Middleware(mw));
            }
            Binding::ErrorMiddleware(mw) => {
                debug!(path = %mw.path, position = self.error_middleware.len(), "error middleware bound");
                self.error_middleware.push(mw);
            }
        }
        Ok(())
    }

    pub(crate) fn endpoint_mut(&mut self, path: &str) -> Option<&mut EndpointBinding<D>> {
        let index = *self.endpoints.get(path)?;
        match &mut self.bindings[index] {
            Binding::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// The endpoint bound at exactly `path`, with its registration position.
    pub(crate) fn endpoint(&self, path: &str) -> Option<(usize, &EndpointBinding<D>)> {
        let index = *self.endpoints.get(path)?;
        match &self.bindings[index] {
            Binding::Endpoint(endpoint) => Some((index, endpoint)),
            _ => None,
        }
    }

    /// Middleware for `path` registered before position `before`, in order.
    pub(crate) fn middleware_for<'t>(
        &'t self,
        path: &'t str,
        before: usize,
    ) -> impl Iterator<Item = &'t MiddlewareBinding<D>> + 't {
        self.bindings[..before].iter()
            .filter_map(|binding| match binding {
                Binding::Middleware(mw) => Some(mw),
                _ => None,
            })
            .filter(move |mw| mw.applies_to(path))
    }

    /// Error middleware for `path`, in registration order.
    pub(crate) fn error_middleware_for<'t>(
        &'t self,
        path: &'t str,
    ) -> impl Iterator<Item = &'t MiddlewareBinding<D>> + 't {
        self.error_middleware.iter().filter(move |mw| mw.applies_to(path))
    }

    /// Number of paths with an endpoint bound.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether an endpoint is bound at exactly `path`.
    pub fn has_endpoint(&self, path: &str) -> bool {
        self.endpoints.contains_key(path)
    }
}

impl<D> std::fmt::Debug for BindingTable<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order: Vec<String> = self.bindings.iter()
            .map(|b| match b {
                Binding::Endpoint(e) => format!("endpoint {} ({})", e.path, e.kind()),
                Binding::Middleware(m) => format!("middleware {}", m.path),
                Binding::ErrorMiddleware(m) => format!("error middleware {}", m.path),
            })
            .collect();
        f.debug_struct("BindingTable")
            .field("bindings", &order)
            .field("error_middleware", &self.error_middleware.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::context::Context;
    use crate::handler::BoxFuture;
    use crate::request::Request;
    use crate::middleware::{Middleware, Next};

    fn pass<'a>(_req: &'a Request, _cx: &'a mut Context) -> BoxFuture<'a, Next> {
        Box::pin(async { Next::Continue })
    }

    fn ok<'a>(_req: Request, _cx: &'a mut Context) -> BoxFuture<'a, StatusCode> {
        Box::pin(async { StatusCode::OK })
    }

    fn endpoint(path: &str, method: Method, route: Route<()>) -> Binding<()> {
        Binding::Endpoint(EndpointBinding::new(path, method, route))
    }

    fn middleware(path: &str) -> Binding<()> {
        Binding::Middleware(MiddlewareBinding::new(path, pass.into_boxed_middleware()))
    }

    #[test]
    fn second_endpoint_for_a_path_merges() {
        let mut table = BindingTable::new();
        table.register(endpoint("/a", Method::Get, Route::fixed("get"))).unwrap();
        table.register(endpoint("/a", Method::Post, Route::fixed("post"))).unwrap();
        assert_eq!(table.endpoint_count(), 1);

        let (index, binding) = table.endpoint("/a").unwrap();
        assert_eq!(index, 0);
        assert!(matches!(binding.resolve(Method::Get), Resolved::Static(r) if r.body() == b"get"));
        assert!(matches!(binding.resolve(Method::Post), Resolved::Static(r) if r.body() == b"post"));
        assert!(matches!(binding.resolve(Method::Delete), Resolved::Unsupported));
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let mut table = BindingTable::new();
        table.register(endpoint("/a", Method::Get, Route::fixed("get"))).unwrap();
        let err = table.register(endpoint("/a", Method::Post, Route::handler(ok))).unwrap_err();
        assert_eq!(err, ConfigError::MixedHandlerKinds {
            path: "/a".into(),
            method: Method::Post,
            existing: RouteKind::Static,
            attempted: RouteKind::Dynamic,
        });
    }

    #[test]
    fn set_method_overwrites_and_checks_kind() {
        let mut binding = EndpointBinding::<()>::new("/a", Method::Get, Route::handler(ok));
        binding.set_method(Method::Get, Route::handler(ok)).unwrap();
        let err = binding.set_method(Method::Patch, Route::fixed("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::MixedHandlerKinds { method: Method::Patch, .. }));
        assert!(matches!(binding.resolve(Method::Patch), Resolved::Unsupported));
    }

    #[test]
    fn middleware_after_its_endpoint_is_rejected() {
        let mut table = BindingTable::new();
        table.register(endpoint("/a", Method::Get, Route::fixed("a"))).unwrap();
        assert_eq!(
            table.register(middleware("/a")).unwrap_err(),
            ConfigError::MiddlewareAfterEndpoint { path: "/a".into() }
        );
        // Root middleware after some other path's endpoint is fine.
        table.register(middleware(ROOT)).unwrap();
    }

    #[test]
    fn only_earlier_matching_middleware_apply() {
        let mut table = BindingTable::new();
        table.register(middleware(ROOT)).unwrap();
        table.register(middleware("/a")).unwrap();
        table.register(middleware("/b")).unwrap();
        table.register(endpoint("/a", Method::Get, Route::fixed("a"))).unwrap();
        table.register(middleware(ROOT)).unwrap();

        let (index, _) = table.endpoint("/a").unwrap();
        let paths: Vec<&str> = table.middleware_for("/a", index).map(|m| m.path.as_str()).collect();
        assert_eq!(paths, [ROOT, "/a"]);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let mut table = BindingTable::<()>::new();
        assert_eq!(
            table.register(middleware("users")).unwrap_err(),
            ConfigError::InvalidPath { path: "users".into() }
        );
    }
}
