//! Endpoint handlers, type erasure, and the static/dynamic route union.
//!
//! # How async handlers are stored
//!
//! An endpoint binding holds handlers of *different* concrete types in one
//! slot array, so each handler is wrapped in an `Arc<dyn ErasedHandler<D>>`.
//!
//! ```text
//! fn hello<'a>(req, cx: &'a mut Context) -> BoxFuture<'a, R>  ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                                   ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                                   ← heap-allocated wrapper
//!        ↓  stored as Route::Dynamic(BoxedHandler<D>)
//! handler.call(req, &mut cx)  at request time                  ← one vtable dispatch
//! ```
//!
//! Handlers borrow the request context mutably for the duration of their
//! future, which is why the signature spells out the `'a` lifetime instead of
//! being a plain `async fn`: the returned future may hold on to `cx`.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future borrowing from the dispatch for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Erased handler ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<D>: Send + Sync {
    fn call<'a>(&'a self, req: Request, cx: &'a mut Context<D>) -> BoxFuture<'a, Response>;
}

/// A type-erased endpoint handler shared by every request that reaches it.
#[doc(hidden)]
pub type BoxedHandler<D> = Arc<dyn ErasedHandler<D> + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid endpoint handler.
///
/// You never implement this yourself. It is satisfied by any function with
/// the shape:
///
/// ```text
/// fn name<'a>(req: Request, cx: &'a mut Context<D>) -> BoxFuture<'a, impl IntoResponse>
/// ```
///
/// `R` is the handler's response type; it only exists so the blanket impl
/// can name it. The trait is sealed, so the blanket impl is the only one.
pub trait Handler<D, R>: private::Sealed<D, R> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<D>;
}

mod private {
    pub trait Sealed<D, R> {}
}

impl<F, D, R> private::Sealed<D, R> for F
where
    F: for<'a> Fn(Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync + 'static,
    D: 'static,
    R: IntoResponse + 'static,
{
}

impl<F, D, R> Handler<D, R> for F
where
    F: for<'a> Fn(Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync + 'static,
    D: 'static,
    R: IntoResponse + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<D> {
        Arc::new(FnHandler { f: self, _marker: PhantomData })
    }
}

/// Holds a concrete handler `F` and bridges it to [`ErasedHandler`].
struct FnHandler<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, D, R> ErasedHandler<D> for FnHandler<F, R>
where
    F: for<'a> Fn(Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync,
    R: IntoResponse + 'static,
{
    fn call<'a>(&'a self, req: Request, cx: &'a mut Context<D>) -> BoxFuture<'a, Response> {
        let fut = (self.f)(req, cx);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// What an endpoint binding answers a method with.
pub enum Route<D> {
    /// A precomputed response, cloned out unchanged for every request.
    Static(Response),
    /// A handler invoked with the request and its context.
    Dynamic(BoxedHandler<D>),
}

impl<D> Route<D> {
    /// A static route from anything that converts into a response.
    pub fn fixed(response: impl IntoResponse) -> Self {
        Self::Static(response.into_response())
    }

    /// A dynamic route from a handler function.
    pub fn handler<R>(handler: impl Handler<D, R>) -> Self {
        Self::Dynamic(handler.into_boxed_handler())
    }

    pub fn kind(&self) -> RouteKind {
        match self {
            Self::Static(_)  => RouteKind::Static,
            Self::Dynamic(_) => RouteKind::Dynamic,
        }
    }
}

impl<D> fmt::Debug for Route<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(res) => f.debug_tuple("Static").field(res).finish(),
            Self::Dynamic(_)  => f.write_str("Dynamic(..)"),
        }
    }
}

/// Whether an endpoint binding holds static responses or handlers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteKind {
    Static,
    Dynamic,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static  => "static",
            Self::Dynamic => "dynamic",
        })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn greet<'a>(req: Request, cx: &'a mut Context<u32>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            *cx.data_mut() += 1;
            Response::text(format!("hello {}", req.path()))
        })
    }

    fn teapot<'a>(_req: Request, _cx: &'a mut Context<u32>) -> BoxFuture<'a, StatusCode> {
        Box::pin(async { StatusCode::IM_A_TEAPOT })
    }

    #[tokio::test]
    async fn erased_handler_sees_the_context() {
        let handler = greet.into_boxed_handler();
        let mut cx = Context::new(0);
        let res = handler.call(Request::new("GET", "/x"), &mut cx).await;
        assert_eq!(res.body(), b"hello /x");
        assert_eq!(*cx.data(), 1);
    }

    #[tokio::test]
    async fn handler_output_goes_through_into_response() {
        let route = Route::handler(teapot);
        assert_eq!(route.kind(), RouteKind::Dynamic);
        let Route::Dynamic(handler) = route else { unreachable!() };
        let res = handler.call(Request::new("GET", "/"), &mut Context::new(0)).await;
        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn fixed_routes_are_static() {
        let route: Route<()> = Route::fixed("ok");
        assert_eq!(route.kind(), RouteKind::Static);
        assert_eq!(RouteKind::Dynamic.to_string(), "dynamic");
    }
}
