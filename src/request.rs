//! Incoming HTTP request type.
//!
//! The routing core consumes requests that some listener has already parsed.
//! The method is kept as the raw token: normalizing it is the dispatcher's
//! first step, and an unknown token is an answerable client error, not a
//! parse failure.

use bytes::Bytes;

/// An incoming HTTP request, already parsed by the host listener.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Request {
    /// A request with no headers and an empty body.
    ///
    /// ```rust
    /// use waypost::Request;
    ///
    /// let req = Request::new("GET", "/users")
    ///     .with_header("authorization", "Bearer abc")
    ///     .with_body(r#"{"name":"alice"}"#);
    /// assert_eq!(req.header("Authorization"), Some("Bearer abc"));
    /// ```
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The method token exactly as the client sent it.
    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
