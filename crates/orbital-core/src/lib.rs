//! # orbital-core
//!
//! Core abstractions for the Orbital analytical lakehouse.
//!
//! This crate provides the primitives shared across all Orbital components:
//!
//! - **Storage Backends**: The object-store contract snapshot files and
//!   catalog metadata live behind, with in-memory and S3 implementations
//! - **Layer Identity**: The RAW/STAGED/CLEANED promotion layers and the
//!   deterministic snapshot-file-to-table-name mapping
//! - **Configuration**: Environment-driven lakehouse configuration
//! - **Error Types**: Shared error definitions and result types
//! - **Run Identifiers**: Sortable, globally unique sync-run IDs
//!
//! ## Crate Boundary
//!
//! `orbital-core` is the only crate allowed to define shared primitives.
//! The synchronization engine, the serving API, and the CLI all build on
//! the contracts defined here.
//!
//! ## Example
//!
//! ```rust
//! use orbital_core::prelude::*;
//!
//! let table = TableIdent::new(Layer::Raw, table_name_from_file("nasa_apod.parquet"));
//! assert_eq!(table.qualified(), "RAW.NASA_APOD");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod id;
pub mod layer;
pub mod observability;
pub mod s3;
pub mod storage;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use orbital_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::LakeConfig;
    pub use crate::error::{Error, Result};
    pub use crate::id::RunId;
    pub use crate::layer::{Layer, TableIdent, table_name_from_file};
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult,
    };
}

// Re-export key types at crate root for ergonomics
pub use config::LakeConfig;
pub use error::{Error, Result};
pub use id::RunId;
pub use layer::{Layer, TableIdent, table_name_from_file};
pub use observability::{LogFormat, init_logging, sync_span};
pub use s3::S3Backend;
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult};
