//! Error types for handoff.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors relayed through a handoff.
///
/// Cancellation reasons (`Canceled`, `DeadlineExceeded`) come from the token.
/// Everything else is payload a producer hands to its consumer. The type is
/// `Clone` so `fatal` can both deliver an error and return it.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Build a payload error from a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Error::Message(message.to_string())
    }

    /// Wrap an arbitrary error as payload.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Source(Arc::new(err))
    }

    /// True for the reasons a token reports once signaled.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Canceled, Error::Canceled) => true,
            (Error::DeadlineExceeded, Error::DeadlineExceeded) => true,
            (Error::Config(a), Error::Config(b)) => a == b,
            (Error::Message(a), Error::Message(b)) => a == b,
            // Wrapped sources have no structural equality; identity only.
            (Error::Source(a), Error::Source(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::wrap(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::wrap(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Canceled.to_string(), "context canceled");
        assert_eq!(Error::DeadlineExceeded.to_string(), "context deadline exceeded");
        assert_eq!(Error::msg("bad row 3").to_string(), "bad row 3");
    }

    #[test]
    fn test_source_equality_is_identity() {
        let io = Error::wrap(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        let same = io.clone();
        let other = Error::wrap(std::io::Error::new(std::io::ErrorKind::Other, "disk"));

        assert_eq!(io, same);
        assert_ne!(io, other);
        assert_eq!(io.to_string(), "disk");
    }

    #[test]
    fn test_is_cancellation() {
        assert!(Error::Canceled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::Config("x".into()).is_cancellation());
        assert!(!Error::msg("x").is_cancellation());
    }
}
