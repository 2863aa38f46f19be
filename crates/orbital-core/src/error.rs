//! Error types and result aliases shared across Orbital components.
//!
//! The storage-facing error taxonomy lives here; the synchronization engine
//! layers its own pipeline errors on top in `orbital-lake`.

/// The result type used throughout Orbital core components.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core Orbital operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object store could not be reached or refused the operation.
    #[error("object store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the connectivity or auth failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A precondition for the operation was not met.
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Description of the failed precondition.
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new store-unavailable error with the given message.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store-unavailable error with a source cause.
    #[must_use]
    pub fn store_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error represents a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_formats_message() {
        let err = Error::store_unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "object store unavailable: connection refused"
        );
    }

    #[test]
    fn not_found_predicate() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(!Error::internal("boom").is_not_found());
    }
}
