//! Error types for the synchronization engine.
//!
//! The taxonomy mirrors the pipeline's failure-handling policy:
//!
//! - `MissingDefinition` is fatal and raised before any catalog mutation
//! - per-file ingestion failures are recovered locally and aggregated into
//!   the registrar's summary (so there is no `Ingestion` variant here)
//! - `Transform` is fatal and aborts the run
//! - check execution failures are downgraded to failing check verdicts by
//!   the quality gate and never reach the orchestrator

use std::path::PathBuf;

use datafusion::error::DataFusionError;

/// The result type used throughout the synchronization engine.
pub type Result<T> = std::result::Result<T, LakeError>;

/// Errors raised by the synchronization engine.
#[derive(Debug, thiserror::Error)]
pub enum LakeError {
    /// The catalog metadata location is unreachable or corrupt.
    #[error("failed to attach catalog at {location}: {message}")]
    CatalogAttach {
        /// Metadata location that failed to attach.
        location: String,
        /// Description of the failure.
        message: String,
    },

    /// A referenced transform/check definition file is absent.
    #[error("definition file not found: {path}")]
    MissingDefinition {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A transformation definition failed; the batch is aborted.
    #[error("transformation {definition} failed: {message}")]
    Transform {
        /// Name of the failing definition.
        definition: String,
        /// Description of the failure.
        message: String,
    },

    /// A catalog commit lost a conditional-write race.
    ///
    /// Under the single-writer model this indicates a second sync run is
    /// holding the same metadata location.
    #[error("catalog commit conflict: {message}")]
    CommitConflict {
        /// Description of the conflict.
        message: String,
    },

    /// A query-engine failure outside a named transformation.
    #[error(transparent)]
    Query(#[from] DataFusionError),

    /// Parquet encode/decode failure.
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow batch construction failure.
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    /// A storage-layer failure.
    #[error(transparent)]
    Store(#[from] orbital_core::Error),

    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl LakeError {
    /// Creates a catalog-attach error.
    #[must_use]
    pub fn catalog_attach(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CatalogAttach {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Creates a transform failure naming the definition.
    #[must_use]
    pub fn transform(definition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            definition: definition.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_error_names_the_definition() {
        let err = LakeError::transform("STAGED_ASTRONAUTS", "table not found");
        assert_eq!(
            err.to_string(),
            "transformation STAGED_ASTRONAUTS failed: table not found"
        );
    }

    #[test]
    fn missing_definition_carries_path() {
        let err = LakeError::MissingDefinition {
            path: PathBuf::from("definitions/staging/STAGED_ASTRONAUTS.sql"),
        };
        assert!(err.to_string().contains("STAGED_ASTRONAUTS.sql"));
    }
}
