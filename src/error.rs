//! Error types for ragslab.
//!
//! Chunking can only fail with [`ErrorKind::InvalidArgument`]. Every other
//! kind comes from a collaborator (embedding service, chat service, vector
//! index) and is reported unchanged to the caller.

use std::fmt;

/// Errors produced by chunking and by the collaborators around it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid chunk size (must be > 0).
    #[error("invalid chunk size: {0} (must be > 0)")]
    InvalidChunkSize(i64),

    /// Negative overlap.
    #[error("invalid chunk overlap: {0} (must be >= 0)")]
    NegativeOverlap(i64),

    /// Overlap is not smaller than the chunk size, so the cursor would never advance.
    #[error("overlap {overlap} must be smaller than chunk size {size}")]
    OverlapExceedsSize {
        /// The chunk size.
        size: usize,
        /// The overlap that reached or exceeded the size.
        overlap: usize,
    },

    /// A separator-based splitter was given an empty separator.
    #[error("separator must not be empty")]
    EmptySeparator,

    /// Any other rejected argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector dimension does not match the collection.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of vectors already in the collection.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// The session was terminated and accepts no more questions.
    #[error("session is closed")]
    SessionClosed,

    /// A question was asked before anything was ingested.
    #[error("index is empty; ingest documents first")]
    EmptyIndex,

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote service rejected the request because of rate limits.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The remote service could not be reached or failed internally.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The remote service answered with something we could not interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Local embedding model error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Snapshot (de)serialization failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`], used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad parameters. Fatal to the call, never retried.
    InvalidArgument,
    /// Transport failure or 5xx from a service.
    ServiceUnavailable,
    /// 429 from a service.
    RateLimited,
    /// Response did not match the expected contract.
    MalformedResponse,
    /// Missing credential or unreadable config.
    Config,
    /// Local persistence or model failure.
    Storage,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChunkSize(_)
            | Self::NegativeOverlap(_)
            | Self::OverlapExceedsSize { .. }
            | Self::EmptySeparator
            | Self::InvalidArgument(_)
            | Self::DimensionMismatch { .. }
            | Self::SessionClosed => ErrorKind::InvalidArgument,
            Self::Config(_) | Self::EmptyIndex => ErrorKind::Config,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Embedding(_) | Self::Storage(_) | Self::Io(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller may retry the failed operation after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited | ErrorKind::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::ServiceUnavailable => "service unavailable",
            Self::RateLimited => "rate limited",
            Self::MalformedResponse => "malformed response",
            Self::Config => "configuration",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Result type for ragslab operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_errors_are_invalid_argument() {
        let errors = [
            Error::InvalidChunkSize(0),
            Error::NegativeOverlap(-1),
            Error::OverlapExceedsSize { size: 4, overlap: 4 },
            Error::EmptySeparator,
        ];
        for err in &errors {
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::RateLimited("slow down".into()).is_retryable());
        assert!(Error::ServiceUnavailable("502".into()).is_retryable());
        assert!(!Error::MalformedResponse("no choices".into()).is_retryable());
        assert!(!Error::Config("missing key".into()).is_retryable());
        assert!(!Error::EmptyIndex.is_retryable());
        assert_eq!(Error::EmptyIndex.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_messages_name_the_cause() {
        let err = Error::OverlapExceedsSize { size: 10, overlap: 12 };
        assert_eq!(err.to_string(), "overlap 12 must be smaller than chunk size 10");
    }
}
