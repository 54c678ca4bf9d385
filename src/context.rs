//! Per-request state shared by every handler of one dispatch.

/// Mutable state that lives for exactly one request.
///
/// A fresh `Context` is created right before dispatch and dropped once a
/// response is produced. Every middleware, error middleware and endpoint
/// invoked for the request receives the same `&mut Context<D>`.
///
/// - The **error stack** records every message a middleware failed with,
///   in order. Entries are only ever appended.
/// - The **data bag** `D` belongs to the application. The framework never
///   reads it; use it to hand information forward, e.g. the identity an
///   authentication middleware resolved.
///
/// ```rust
/// use waypost::Context;
///
/// #[derive(Default)]
/// struct Session { user: Option<String> }
///
/// let mut cx = Context::<Session>::default();
/// cx.data_mut().user = Some("alice".into());
/// assert!(cx.errors().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Context<D = ()> {
    error_stack: Vec<String>,
    data: D,
}

impl<D> Context<D> {
    /// A context seeded with application data and an empty error stack.
    pub fn new(data: D) -> Self {
        Self { error_stack: Vec::new(), data }
    }

    /// Every error message pushed so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.error_stack
    }

    /// The most recent error message, if any middleware has failed.
    pub fn last_error(&self) -> Option<&str> {
        self.error_stack.last().map(String::as_str)
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn into_data(self) -> D {
        self.data
    }

    pub(crate) fn push_error(&mut self, message: String) {
        self.error_stack.push(message);
    }
}
