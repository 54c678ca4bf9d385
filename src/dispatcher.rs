//! Request dispatch: one request in, exactly one response out.
//!
//! ```text
//! MatchMethod ──unknown token──▶ 400 Unrecognized method
//!     │
//! MatchPath ──no endpoint──▶ 404 not-found
//!     │
//! RunMiddlewareChain ──Respond──▶ Done
//!     │         └──Fail(msg)──▶ RunErrorChain ──Respond──▶ Done
//!     │                               └──exhausted──▶ ContractViolation
//! RunEndpoint ──▶ static clone │ handler(req, cx) │ 400 Unsupported method
//! ```
//!
//! Each handler's future is awaited to completion before the next handler
//! starts. Nothing is retried. Dropping the dispatch future (the client went
//! away) stops the chain wherever it is.

use tracing::debug;

use crate::binding::{BindingTable, Resolved};
use crate::canned;
use crate::context::Context;
use crate::error::{Chain, ContractViolation};
use crate::method::Method;
use crate::middleware::Next;
use crate::request::Request;
use crate::response::Response;

/// Routes `req` through `table`, sharing `cx` with every handler invoked.
///
/// Client errors come back as canned responses. `Err` means a handler broke
/// its contract, i.e. the application is misconfigured.
pub async fn dispatch<D>(
    table: &BindingTable<D>,
    req: Request,
    cx: &mut Context<D>,
) -> Result<Response, ContractViolation> {
    let Some(method) = Method::parse(req.method()) else {
        debug!(method = %req.method(), path = %req.path(), "unrecognized method");
        return Ok(canned::unrecognized_method());
    };

    let Some((position, endpoint)) = table.endpoint(req.path()) else {
        debug!(%method, path = %req.path(), "no endpoint");
        return Ok(canned::not_found());
    };

    for (index, mw) in table.middleware_for(req.path(), position).enumerate() {
        match mw.handler().call(&req, cx).await {
            Some(Next::Continue) => {}
            Some(Next::Respond(res)) => {
                debug!(%method, path = %req.path(), index, status = %res.status_code(), "middleware responded");
                return Ok(res);
            }
            Some(Next::Fail(message)) if message.is_empty() => {}
            Some(Next::Fail(message)) => {
                debug!(%method, path = %req.path(), index, error = %message, "middleware failed, entering error chain");
                cx.push_error(message);
                return run_error_chain(table, &req, cx).await;
            }
            None => {
                return Err(ContractViolation::NoOutcome {
                    chain: Chain::Standard,
                    path: req.path().to_owned(),
                    position: index,
                });
            }
        }
    }

    match endpoint.resolve(method) {
        Resolved::Static(res) => Ok(res.clone()),
        Resolved::Dynamic(handler) => {
            debug!(%method, path = %endpoint.path(), "running endpoint");
            Ok(handler.call(req, cx).await)
        }
        Resolved::Unsupported => Ok(canned::unsupported_method()),
    }
}

async fn run_error_chain<D>(
    table: &BindingTable<D>,
    req: &Request,
    cx: &mut Context<D>,
) -> Result<Response, ContractViolation> {
    for (index, mw) in table.error_middleware_for(req.path()).enumerate() {
        match mw.handler().call(req, cx).await {
            Some(Next::Respond(res)) => {
                debug!(path = %req.path(), index, status = %res.status_code(), "error middleware responded");
                return Ok(res);
            }
            Some(Next::Continue) => {}
            Some(Next::Fail(message)) => {
                if !message.is_empty() {
                    cx.push_error(message);
                }
            }
            None => {
                return Err(ContractViolation::NoOutcome {
                    chain: Chain::Error,
                    path: req.path().to_owned(),
                    position: index,
                });
            }
        }
    }

    Err(ContractViolation::ErrorChainExhausted {
        path: req.path().to_owned(),
        errors: cx.errors().to_vec(),
    })
}

impl<D> BindingTable<D> {
    /// Dispatches with a fresh default context.
    pub async fn dispatch(&self, req: Request) -> Result<Response, ContractViolation>
    where
        D: Default,
    {
        let mut cx = Context::default();
        dispatch(self, req, &mut cx).await
    }

    /// Dispatches with a caller-supplied context, which can be inspected
    /// afterwards.
    pub async fn dispatch_with(
        &self,
        req: Request,
        cx: &mut Context<D>,
    ) -> Result<Response, ContractViolation> {
        dispatch(self, req, cx).await
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::handler::BoxFuture;
    use crate::router::Router;

    type Trace = Vec<&'static str>;

    fn first<'a>(_req: &'a Request, cx: &'a mut Context<Trace>) -> BoxFuture<'a, Next> {
        Box::pin(async move {
            cx.data_mut().push("first");
            Next::fail("")
        })
    }

    fn second<'a>(_req: &'a Request, cx: &'a mut Context<Trace>) -> BoxFuture<'a, Next> {
        Box::pin(async move {
            // Suspends, so a later handler starting early would show up in the trace.
            tokio::task::yield_now().await;
            cx.data_mut().push("second");
            Next::Continue
        })
    }

    fn endpoint<'a>(_req: Request, cx: &'a mut Context<Trace>) -> BoxFuture<'a, StatusCode> {
        Box::pin(async move {
            cx.data_mut().push("endpoint");
            StatusCode::OK
        })
    }

    fn recover<'a>(_req: &'a Request, cx: &'a mut Context<Trace>) -> BoxFuture<'a, Next> {
        Box::pin(async move {
            cx.data_mut().push("recover");
            Next::Continue
        })
    }

    #[tokio::test]
    async fn empty_failure_message_continues() {
        let table = Router::new()
            .middleware("/", first)
            .middleware("/p", second)
            .get("/p", endpoint)
            .error_middleware("/p", recover)
            .build()
            .unwrap();

        let mut cx = Context::default();
        let res = table.dispatch_with(Request::new("GET", "/p"), &mut cx).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(cx.data(), &["first", "second", "endpoint"]);
        assert!(cx.errors().is_empty());
    }

    #[tokio::test]
    async fn unsupported_method_still_runs_middleware() {
        let table = Router::new()
            .middleware("/p", second)
            .get("/p", endpoint)
            .build()
            .unwrap();

        let mut cx = Context::default();
        let res = table.dispatch_with(Request::new("DELETE", "/p"), &mut cx).await.unwrap();
        assert_eq!(res, canned::unsupported_method());
        assert_eq!(cx.data(), &["second"]);
    }

    #[tokio::test]
    async fn unknown_method_runs_nothing() {
        let table = Router::new()
            .middleware("/p", second)
            .get("/p", endpoint)
            .build()
            .unwrap();

        let mut cx = Context::default();
        let res = table.dispatch_with(Request::new("PUT", "/p"), &mut cx).await.unwrap();
        assert_eq!(res, canned::unrecognized_method());
        assert!(cx.data().is_empty());
    }

    #[tokio::test]
    async fn exhausted_error_chain_is_a_violation() {
        fn boom<'a>(_req: &'a Request, _cx: &'a mut Context<Trace>) -> BoxFuture<'a, Next> {
            Box::pin(async { Next::fail("boom") })
        }

        let table = Router::new()
            .middleware("/p", boom)
            .get("/p", endpoint)
            .error_middleware("/p", recover)
            .build()
            .unwrap();

        let mut cx = Context::default();
        let err = table.dispatch_with(Request::new("GET", "/p"), &mut cx).await.unwrap_err();
        assert_eq!(err, ContractViolation::ErrorChainExhausted {
            path: "/p".into(),
            errors: vec!["boom".into()],
        });
        assert_eq!(cx.data(), &["recover"]);
    }
}
