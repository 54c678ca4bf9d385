//! Fixed responses the dispatcher answers with on its own.
//!
//! Bodies are part of the public contract and must stay byte-for-byte stable.

use http::StatusCode;

use crate::response::Response;

pub const UNSUPPORTED_METHOD: &str = r#"{"error":"Unsupported method"}"#;
pub const UNRECOGNIZED_METHOD: &str = r#"{"error":"Unrecognized method"}"#;
pub const NOT_FOUND: &str = r#"{"error":"not-found"}"#;

/// `400`: the path is bound but nothing is bound for this method.
pub fn unsupported_method() -> Response {
    error(StatusCode::BAD_REQUEST, UNSUPPORTED_METHOD)
}

/// `400`: the method token is not one of GET, POST, PATCH, DELETE.
pub fn unrecognized_method() -> Response {
    error(StatusCode::BAD_REQUEST, UNRECOGNIZED_METHOD)
}

/// `404`: no endpoint is bound at this exact path.
pub fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, NOT_FOUND)
}

fn error(status: StatusCode, body: &'static str) -> Response {
    Response::builder().status(status).json(body)
}
