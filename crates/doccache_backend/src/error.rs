// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for query cache operations.

use std::fmt::{self, Display};

/// The category of a query cache failure.
///
/// Every failure surfaced by the cache belongs to exactly one category so that callers
/// can tell a broken store apart from a broken query or a broken setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The backend failed during lookup, store, delete, clear, or script evaluation.
    #[default]
    Backend,
    /// The wrapped query execution failed.
    Execution,
    /// The cache annotations are invalid for the configured backend or result.
    Configuration,
    /// A raw result could not be rebuilt into the caller's requested shape.
    Hydration,
}

impl ErrorKind {
    /// Returns the lowercase name of this kind, as used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Execution => "execution",
            Self::Configuration => "configuration",
            Self::Hydration => "hydration",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a query cache operation.
///
/// The error carries its [`ErrorKind`] and the original cause, which stays reachable
/// through [`std::error::Error::source()`] or [`ohno::ErrorExt::find_source`].
///
/// # Example
///
/// ```
/// use doccache_backend::{Error, ErrorKind};
///
/// let error = Error::backend("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Backend);
/// ```
#[ohno::error]
#[display("query cache {kind} error")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a backend error from the store's own failure.
    pub fn backend(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backend, cause)
    }

    /// Creates an execution error from the wrapped query's failure.
    pub fn execution(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Execution, cause)
    }

    /// Creates a configuration error describing what is misconfigured.
    pub fn configuration(message: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Configuration, message)
    }

    /// Creates a hydration error from the reconstitution failure.
    pub fn hydration(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Hydration, cause)
    }

    pub(crate) fn scripts_unsupported(script: &str, arg_count: usize) -> Self {
        Self::configuration(format!(
            "backend does not support script evaluation (script {script:?} with {arg_count} argument(s))"
        ))
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }
}

/// A specialized [`Result`] type for query cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_kind_and_cause() {
        let error = Error::backend("socket closed");
        let display_str = format!("{error}");
        assert!(display_str.contains("backend"), "got: {display_str}");
        assert!(display_str.contains("socket closed"), "got: {display_str}");
    }

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Error::backend("x").kind(), ErrorKind::Backend);
        assert_eq!(Error::execution("x").kind(), ErrorKind::Execution);
        assert_eq!(Error::configuration("x").kind(), ErrorKind::Configuration);
        assert_eq!(Error::hydration("x").kind(), ErrorKind::Hydration);
    }

    #[test]
    fn scripts_unsupported_is_configuration() {
        let error = Error::scripts_unsupported("abc123", 2);
        assert!(error.is_configuration());
        assert!(format!("{error}").contains("abc123"));
    }

    #[test]
    fn source_is_preserved() {
        use ohno::ErrorExt;

        let io_error = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let error = Error::backend(io_error);
        let found = error.find_source::<std::io::Error>().expect("io error should be in the chain");
        assert_eq!(found.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::Backend.to_string(), "backend");
        assert_eq!(ErrorKind::Configuration.as_str(), "configuration");
        assert_eq!(ErrorKind::default(), ErrorKind::Backend);
    }
}
