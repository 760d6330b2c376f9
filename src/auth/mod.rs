//! Authenticated session provider.
//!
//! Logging in is the only stateful, sequential step in a run: it happens
//! once, produces a [`Session`], and everything downstream derives its
//! request capability from that session.

mod login;

use std::fmt;

pub use login::{LOGGED_IN_MARKER, attempt_login};

/// An authenticated platform session.
///
/// Wraps the serialized cookie header captured at login (`name=value` pairs
/// joined by `; `). Created once per run, never mutated, never persisted.
/// The cookie value is redacted in Debug output to prevent accidental
/// logging of credentials.
#[derive(Clone)]
pub struct Session {
    /// Serialized cookie header (sensitive, never log).
    cookie: String,
}

impl Session {
    /// Wraps an already-serialized cookie header string.
    #[must_use]
    pub fn new(cookie: String) -> Self {
        Self { cookie }
    }

    /// Returns the value to send as the `Cookie` request header.
    ///
    /// Cookie strings are sensitive; avoid logging the return value.
    #[must_use]
    pub fn cookie_header(&self) -> &str {
        &self.cookie
    }
}

// Custom Debug impl that redacts the cookie string.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie", &"[REDACTED]")
            .finish()
    }
}
