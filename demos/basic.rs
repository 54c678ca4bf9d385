//! Minimal waypost example: a global auth middleware, an error chain, one
//! static and a few dynamic endpoints.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users -H 'authorization: alice'
//!   curl http://localhost:3000/users                      # 401 from the error chain
//!   curl -X POST http://localhost:3000/users -H 'authorization: alice' -d '{"name":"bob"}'
//!   curl -X PUT http://localhost:3000/users               # 400 Unrecognized method
//!   curl http://localhost:3000/nowhere                    # 404 not-found

use http::StatusCode;
use waypost::{BoxFuture, Context, Method, Next, Request, Response, Router, Server};

#[derive(Default)]
struct Session {
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), waypost::Error> {
    tracing_subscriber::fmt::init();

    let table = Router::new()
        .on_static(Method::Get, "/", Response::json(r#"{"msg":"ok"}"#))
        .middleware("/users", authenticate)
        .error_middleware("/", unauthorized)
        .get("/users", list_users)
        .post("/users", create_user)
        .build()?;

    Server::bind(([0, 0, 0, 0], 3000)).serve(table).await
}

// Every /users request needs an authorization header; the identity is
// handed to the endpoint through the context.
fn authenticate<'a>(req: &'a Request, cx: &'a mut Context<Session>) -> BoxFuture<'a, Next> {
    Box::pin(async move {
        match req.header("authorization") {
            Some(user) => {
                cx.data_mut().user = Some(user.to_owned());
                Next::Continue
            }
            None => Next::fail("missing authorization header"),
        }
    })
}

fn unauthorized<'a>(_req: &'a Request, cx: &'a mut Context<Session>) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let reason = cx.last_error().unwrap_or("unauthorized");
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .json(format!(r#"{{"error":"{reason}"}}"#))
    })
}

// GET /users
fn list_users<'a>(_req: Request, cx: &'a mut Context<Session>) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let me = cx.data().user.as_deref().unwrap_or("unknown");
        Response::json(format!(r#"{{"requested_by":"{me}","users":["alice","bob"]}}"#))
    })
}

// POST /users
//
// req.body() is &[u8]; waypost does not touch the bytes.
fn create_user<'a>(req: Request, _cx: &'a mut Context<Session>) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        if req.body().is_empty() {
            return Response::status(StatusCode::BAD_REQUEST);
        }
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(r#"{"id":"99"}"#)
    })
}
