//! HTTP method as a typed enum.
//!
//! Only the four methods an endpoint binding can hold a slot for are known.
//! Any other token is rejected by the dispatcher with the canned
//! `400 Unrecognized method` response before the path is even looked up.

use std::fmt;
use std::str::FromStr;

/// A method an endpoint can be bound to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Every known method, in slot order.
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Patch, Method::Delete];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get    => "GET",
            Self::Post   => "POST",
            Self::Patch  => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Normalizes a raw method token from the wire.
    ///
    /// Surrounding whitespace is ignored and the comparison is ASCII
    /// case-insensitive, so `"get"`, `" GET "` and `"GET"` all resolve to
    /// [`Method::Get`]. Returns `None` for anything else (`HEAD`, `PUT`, …).
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|m| m.as_str().eq_ignore_ascii_case(token))
    }

    /// Position of this method's slot inside an endpoint binding.
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Get    => 0,
            Self::Post   => 1,
            Self::Patch  => 2,
            Self::Delete => 3,
        }
    }
}

/// Error returned when a string is not one of the known methods.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unrecognized method `{0}`")]
pub struct UnrecognizedMethod(pub String);

impl FromStr for Method {
    type Err = UnrecognizedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnrecognizedMethod(s.to_owned()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
