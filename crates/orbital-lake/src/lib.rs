//! # orbital-lake
//!
//! The Orbital lakehouse synchronization engine.
//!
//! External datasets land as immutable parquet snapshot files in object
//! storage. This crate registers them into a versioned catalog and promotes
//! them through three quality-gated layers:
//!
//! ```text
//! RAW_DATA/*.parquet ──register──▶ RAW ──transform──▶ STAGED ──gate──▶ CLEANED
//! ```
//!
//! Components, leaf-first:
//!
//! - [`catalog`]: the versioned catalog document - every table replacement
//!   commits a new immutable snapshot via a conditional write
//! - [`session`]: connector and session - attaches the catalog, owns the
//!   query engine, performs atomic table replacement
//! - [`registrar`]: discovers snapshot files and materializes one RAW table
//!   per file, stamping provenance columns (best-effort per file)
//! - [`transform`]: runs ordered transformation definitions layer-to-layer
//!   (fail-fast)
//! - [`quality`]: evaluates violation-set checks; an empty result set is a
//!   pass
//! - [`lifecycle`]: expires superseded catalog snapshots and reclaims
//!   orphaned data files
//! - [`sync`]: the orchestrator - sequences one run through its state
//!   machine and reports the outcome
//!
//! ## Single-writer model
//!
//! One sync run at a time holds the attached catalog; the orchestrator owns
//! the session for the run's lifetime and releases it on every exit path.
//! Catalog commits are conditional writes, so a concurrent writer surfaces
//! as a commit conflict instead of silent corruption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod definitions;
pub mod error;
pub mod lifecycle;
pub mod parquet_io;
pub mod quality;
pub mod registrar;
pub mod session;
pub mod sync;
pub mod transform;

// Re-export main types at crate root
pub use catalog::{CatalogDocument, CatalogSnapshot, TableEntry};
pub use definitions::{DefinitionSet, QualityCheckDefinition, TransformDefinition};
pub use error::{LakeError, Result};
pub use lifecycle::{PruneResult, RetentionPolicy, SnapshotLifecycleManager};
pub use quality::{CheckOutcome, GateResult, QualityGate};
pub use registrar::{IngestionFailure, IngestionSummary, LayerRegistrar};
pub use session::{Connector, Session};
pub use sync::{Promotion, SyncOrchestrator, SyncReport, SyncState};
pub use transform::{TransformOutcome, TransformRunner};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::{CatalogDocument, CatalogSnapshot, TableEntry};
    pub use crate::definitions::DefinitionSet;
    pub use crate::error::{LakeError, Result};
    pub use crate::lifecycle::{RetentionPolicy, SnapshotLifecycleManager};
    pub use crate::quality::{GateResult, QualityGate};
    pub use crate::registrar::{IngestionSummary, LayerRegistrar};
    pub use crate::session::{Connector, Session};
    pub use crate::sync::{Promotion, SyncOrchestrator, SyncReport};
    pub use crate::transform::TransformRunner;
}
