//! Error taxonomy shared by every storage implementation.
//!
//! Callers branch on [`StorageError::NotFound`] for missing keys regardless of
//! which backend produced it. Everything else carries the adapter's underlying
//! diagnostic and is surfaced unchanged.

/// Boxed error type for opaque client failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No object currently exists under the requested key.
    #[error("not found")]
    NotFound,

    /// The backend replied with a shape the adapter cannot interpret.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by a backend client (network, permissions, service errors).
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a backend error wrapping the client's own error.
    pub fn backend(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Returns true for the distinguished missing-key condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
