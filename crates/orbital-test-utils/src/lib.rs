//! # orbital-test-utils
//!
//! Shared fixtures for Orbital tests: record batch builders for the sample
//! dataset families, parquet snapshot encoding, seeded in-memory stores,
//! and on-disk definition sets matching the fixture schemas.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod fixtures;

pub use fixtures::{
    apod_batch, astronauts_batch, parquet_bytes, seed_snapshot_file, write_test_definitions,
};
