//! # orbital-api
//!
//! The read-only query-serving collaborator: a thin HTTP layer over the
//! CLEANED layer of the catalog.
//!
//! The API never sees uncommitted data - every request opens a fresh
//! read session against the current catalog snapshot - and it never leaks
//! internal error detail: unknown datasets map to `404`, invalid
//! pagination to `400`, everything else to a generic `500`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiErrorBody, ApiResult};
pub use server::{AppState, router, serve};
