//! Error types shared across the crate.
//!
//! A single closed set of tagged variants covers every failure the library
//! can report. Each variant carries enough context (URL, path, resource id)
//! to produce a useful message on its own, and [`Error::kind`] exposes a
//! machine-checkable category for the caller's propagation policy.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of resource a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// An enrolled course page.
    Course,
    /// A lecture page within a course.
    Lecture,
    /// A hosted video looked up through the media endpoint.
    Media,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Course => write!(f, "course"),
            Self::Lecture => write!(f, "lecture"),
            Self::Media => write!(f, "media"),
        }
    }
}

/// Coarse error category for propagation decisions.
///
/// Individual media failures are swallowed by the orchestrator; everything
/// else halts the run. The CLI also uses the category to decide between a
/// friendly one-liner and a full error chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed user input, rejected before any network activity.
    InvalidInput,
    /// Login did not yield an authenticated session.
    AuthenticationFailed,
    /// A course, lecture, or media resource could not be located.
    NotFound,
    /// Network or response-decoding failure.
    RequestFailed,
    /// Anything else (filesystem, helper subprocess, internal).
    Other,
}

/// Errors produced by the session provider, fetcher, catalog, resolver,
/// downloaders, and orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// The supplied email does not look like an email address.
    #[error("invalid email address: {email}")]
    InvalidEmail {
        /// The rejected input.
        email: String,
    },

    /// Concurrency limit outside the accepted range.
    #[error("invalid concurrency value {value}: must be between 1 and 100")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// A URL could not be parsed or resolved against the platform origin.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL or path string.
        url: String,
    },

    /// Login completed without producing an authenticated session.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// What the login flow observed.
        reason: String,
    },

    /// A resource existence check failed (structural absence on an HTTP 200
    /// page, or an empty media asset list).
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Which kind of resource was missing.
        resource: Resource,
        /// Identifier or link of the missing resource.
        id: String,
    },

    /// Network-level failure performing a request.
    #[error("request failed for {url}: {source}")]
    Request {
        /// The URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// A response body did not decode into the expected shape.
    #[error("failed to parse {what}: {source}")]
    Parse {
        /// What was being decoded.
        what: &'static str,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure while writing output.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The external stream-extraction helper failed.
    #[error("stream helper failed for {url}: {reason}")]
    Helper {
        /// The media URL handed to the helper.
        url: String,
        /// Spawn failure or exit status description.
        reason: String,
    },

    /// The concurrency gate was closed while tasks were pending.
    #[error("concurrency gate closed unexpectedly")]
    GateClosed,
}

// Variants require context (url, path, resource) that the source errors
// don't carry, so there are no blanket From impls; the helper constructors
// below are the intended construction path.
impl Error {
    /// Creates an invalid-email error.
    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an authentication-failed error.
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    /// Creates a not-found error for the given resource.
    pub fn not_found(resource: Resource, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Creates a request error from a reqwest error.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(what: &'static str, source: serde_json::Error) -> Self {
        Self::Parse { what, source }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a stream-helper error.
    pub fn helper(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Helper {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail { .. }
            | Self::InvalidConcurrency { .. }
            | Self::InvalidUrl { .. } => ErrorKind::InvalidInput,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Request { .. } | Self::Parse { .. } => ErrorKind::RequestFailed,
            Self::Io { .. } | Self::Helper { .. } | Self::GateClosed => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_resource_and_id() {
        let error = Error::not_found(Resource::Course, "123456");
        let msg = error.to_string();
        assert!(msg.contains("course"), "Expected resource in: {msg}");
        assert!(msg.contains("123456"), "Expected id in: {msg}");
    }

    #[test]
    fn test_not_found_kinds_for_each_resource() {
        for resource in [Resource::Course, Resource::Lecture, Resource::Media] {
            let error = Error::not_found(resource, "x");
            assert_eq!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn test_invalid_email_is_invalid_input() {
        let error = Error::invalid_email("not-an-email");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert!(error.to_string().contains("not-an-email"));
    }

    #[test]
    fn test_invalid_concurrency_display_mentions_bounds() {
        let error = Error::InvalidConcurrency { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains('0'));
        assert!(msg.contains("100"));
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_auth_failed_kind_and_display() {
        let error = Error::auth_failed("no logged-in marker on home page");
        assert_eq!(error.kind(), ErrorKind::AuthenticationFailed);
        assert!(error.to_string().contains("logged-in marker"));
    }

    #[test]
    fn test_io_error_is_other() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = Error::io("/tmp/out.mp4", source);
        assert_eq!(error.kind(), ErrorKind::Other);
        assert!(error.to_string().contains("/tmp/out.mp4"));
    }

    #[test]
    fn test_helper_error_display() {
        let error = Error::helper("https://example.com/v.mp4", "exited with status 1");
        assert_eq!(error.kind(), ErrorKind::Other);
        let msg = error.to_string();
        assert!(msg.contains("stream helper"), "Expected helper in: {msg}");
        assert!(msg.contains("status 1"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_parse_error_is_request_failed() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = Error::parse("media info", source);
        assert_eq!(error.kind(), ErrorKind::RequestFailed);
        assert!(error.to_string().contains("media info"));
    }
}
