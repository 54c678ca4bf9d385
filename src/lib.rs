//! # waypost
//!
//! A minimal HTTP routing core. Given a table of path bindings and ordered
//! middleware chains, it decides which handler answers each request.
//!
//! ## The model
//!
//! - **Endpoints** are bound to an exact path, one slot per method (GET,
//!   POST, PATCH, DELETE). A path's slots are either all *static*
//!   (precomputed responses) or all *dynamic* (handlers).
//! - **Middleware** run before the endpoint, in registration order. A
//!   middleware bound to `"/"` applies to every path. Middleware only apply
//!   to endpoints registered after them.
//! - A middleware answers by returning a [`Next`]: continue, respond, or fail
//!   with a message. Failing pushes the message on the request's
//!   [`Context`] and diverts into the **error middleware** chain, which must
//!   end in a response.
//! - Every handler of one request shares one `&mut Context<D>`, with an
//!   append-only error stack and an application data bag `D`.
//!
//! What the core answers on its own:
//!
//! | Situation | Response |
//! |---|---|
//! | method token is not GET/POST/PATCH/DELETE | `400 {"error":"Unrecognized method"}` |
//! | no endpoint at the path | `404 {"error":"not-found"}` |
//! | endpoint has nothing for the method | `400 {"error":"Unsupported method"}` |
//!
//! Misconfiguration is never papered over. Bad bindings fail
//! [`Router::build`]; a handler contract broken at request time comes back
//! as a [`ContractViolation`], and [`Server`] shuts down on one.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use waypost::{BoxFuture, Context, Method, Next, Request, Response, Router, Server};
//!
//! #[derive(Default)]
//! struct Session { user: Option<String> }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::Error> {
//!     let table = Router::new()
//!         .middleware("/", authenticate)
//!         .error_middleware("/", unauthorized)
//!         .on_static(Method::Get, "/", Response::json(r#"{"msg":"ok"}"#))
//!         .get("/me", me)
//!         .build()?;
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(table).await
//! }
//!
//! fn authenticate<'a>(req: &'a Request, cx: &'a mut Context<Session>) -> BoxFuture<'a, Next> {
//!     Box::pin(async move {
//!         match req.header("authorization") {
//!             Some(token) => {
//!                 cx.data_mut().user = Some(token.to_owned());
//!                 Next::Continue
//!             }
//!             None => Next::fail("auth failed"),
//!         }
//!     })
//! }
//!
//! fn unauthorized<'a>(_req: &'a Request, _cx: &'a mut Context<Session>) -> BoxFuture<'a, StatusCode> {
//!     Box::pin(async { StatusCode::UNAUTHORIZED })
//! }
//!
//! fn me<'a>(_req: Request, cx: &'a mut Context<Session>) -> BoxFuture<'a, Response> {
//!     Box::pin(async move {
//!         let user = cx.data().user.clone().unwrap_or_default();
//!         Response::json(format!(r#"{{"user":"{user}"}}"#))
//!     })
//! }
//! ```

mod binding;
mod context;
mod dispatcher;
mod error;
mod handler;
mod method;
mod middleware;
mod request;
mod response;
mod router;
mod server;

pub mod canned;

pub use binding::{BindingTable, ROOT};
pub use context::Context;
pub use dispatcher::dispatch;
pub use error::{Chain, ConfigError, ContractViolation, Error};
pub use handler::{BoxFuture, Handler, Route, RouteKind};
pub use method::{Method, UnrecognizedMethod};
pub use middleware::{IntoNext, Middleware, Next};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Listener, Server};
