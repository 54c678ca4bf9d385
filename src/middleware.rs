//! Middleware and the [`Next`] control signal.
//!
//! A middleware runs before the endpoint of every path it is bound to and
//! decides what happens next by *returning* it:
//!
//! | Returned value | Effect |
//! |---|---|
//! | [`Next::Continue`] | run the next middleware, or the endpoint |
//! | [`Next::Respond`] | this response is final; nothing else runs |
//! | [`Next::Fail`] | push the message on the context's error stack and switch to the error chain |
//!
//! Error middleware have the same shape and follow the same rules inside the
//! error chain, except that running off the end of it is a contract
//! violation: some error middleware must answer.
//!
//! ```rust
//! use waypost::{BoxFuture, Context, Next, Request};
//!
//! fn require_token<'a>(req: &'a Request, cx: &'a mut Context<Option<String>>) -> BoxFuture<'a, Next> {
//!     Box::pin(async move {
//!         match req.header("authorization") {
//!             Some(token) => {
//!                 *cx.data_mut() = Some(token.to_owned());
//!                 Next::Continue
//!             }
//!             None => Next::fail("missing token"),
//!         }
//!     })
//! }
//! ```

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use http::StatusCode;

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Next ──────────────────────────────────────────────────────────────────────

/// What a middleware wants the dispatcher to do after it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Next {
    Continue,
    Respond(Response),
    /// An empty message is treated as [`Next::Continue`].
    Fail(String),
}

impl Next {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn respond(response: impl IntoResponse) -> Self {
        Self::Respond(response.into_response())
    }
}

/// Conversion of a middleware's output into a [`Next`] signal.
///
/// `None` means the middleware produced no outcome at all. The dispatcher
/// treats that as a broken contract, not as an implicit continue.
pub trait IntoNext {
    fn into_next(self) -> Option<Next>;
}

impl IntoNext for Next {
    fn into_next(self) -> Option<Next> { Some(self) }
}

impl IntoNext for Option<Next> {
    fn into_next(self) -> Option<Next> { self }
}

impl IntoNext for Response {
    fn into_next(self) -> Option<Next> { Some(Next::Respond(self)) }
}

impl IntoNext for StatusCode {
    fn into_next(self) -> Option<Next> { Some(Next::Respond(Response::status(self))) }
}

/// `Ok(())` continues, `Err(e)` fails with `e`'s message.
impl<E: Display> IntoNext for Result<(), E> {
    fn into_next(self) -> Option<Next> {
        Some(match self {
            Ok(())   => Next::Continue,
            Err(err) => Next::Fail(err.to_string()),
        })
    }
}

/// A middleware that returns nothing has neither answered nor called next.
impl IntoNext for () {
    fn into_next(self) -> Option<Next> { None }
}

// ── Erased middleware ─────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedMiddleware<D>: Send + Sync {
    fn call<'a>(&'a self, req: &'a Request, cx: &'a mut Context<D>) -> BoxFuture<'a, Option<Next>>;
}

#[doc(hidden)]
pub type BoxedMiddleware<D> = Arc<dyn ErasedMiddleware<D> + Send + Sync + 'static>;

/// Implemented for every valid middleware or error middleware.
///
/// Satisfied by any function with the shape:
///
/// ```text
/// fn name<'a>(req: &'a Request, cx: &'a mut Context<D>) -> BoxFuture<'a, impl IntoNext>
/// ```
///
/// Sealed, like [`Handler`](crate::Handler).
pub trait Middleware<D, R>: private::Sealed<D, R> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware<D>;
}

mod private {
    pub trait Sealed<D, R> {}
}

impl<F, D, R> private::Sealed<D, R> for F
where
    F: for<'a> Fn(&'a Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync + 'static,
    D: 'static,
    R: IntoNext + 'static,
{
}

impl<F, D, R> Middleware<D, R> for F
where
    F: for<'a> Fn(&'a Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync + 'static,
    D: 'static,
    R: IntoNext + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware<D> {
        Arc::new(FnMiddleware { f: self, _marker: PhantomData })
    }
}

struct FnMiddleware<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, D, R> ErasedMiddleware<D> for FnMiddleware<F, R>
where
    F: for<'a> Fn(&'a Request, &'a mut Context<D>) -> BoxFuture<'a, R> + Send + Sync,
    R: IntoNext + 'static,
{
    fn call<'a>(&'a self, req: &'a Request, cx: &'a mut Context<D>) -> BoxFuture<'a, Option<Next>> {
        let fut = (self.f)(req, cx);
        Box::pin(async move { fut.await.into_next() })
    }
}
