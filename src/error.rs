//! Unified error types.
//!
//! Client mistakes (unknown method, unknown path) and application failures
//! (a middleware failing with a message) are answered with HTTP responses and
//! never show up here. What remains are infrastructure failures and
//! misconfiguration: a bad binding caught while building the table, or a
//! handler contract broken while serving.

use std::fmt;

use crate::handler::RouteKind;
use crate::method::Method;

/// The error type returned by waypost's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("http: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

/// A binding rejected while the table was being configured.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("path `{path}` must start with '/'")]
    InvalidPath { path: String },

    #[error("endpoint `{path}` holds {existing} handlers; cannot bind a {attempted} handler for {method}")]
    MixedHandlerKinds {
        path: String,
        method: Method,
        existing: RouteKind,
        attempted: RouteKind,
    },

    #[error("middleware for `{path}` must be registered before its endpoint")]
    MiddlewareAfterEndpoint { path: String },
}

/// Which middleware chain a handler belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Chain {
    Standard,
    Error,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "middleware",
            Self::Error    => "error middleware",
        })
    }
}

/// A handler contract broken during dispatch.
///
/// These mean the server is misconfigured, not that the request was bad, so
/// they are surfaced to the operator instead of being turned into a `500`.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    /// A middleware finished without a response and without calling next.
    #[error("{chain} #{position} on `{path}` produced no response; no-response middleware must call next")]
    NoOutcome { chain: Chain, path: String, position: usize },

    /// Every error middleware passed the request on; nobody answered it.
    #[error("error middleware chain for `{path}` ended without a response (errors: {errors:?})")]
    ErrorChainExhausted { path: String, errors: Vec<String> },
}
