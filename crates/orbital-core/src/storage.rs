//! Storage backend abstraction for snapshot files and catalog metadata.
//!
//! Everything Orbital persists lives in object storage: producer-written
//! snapshot files, catalog table data files, and the catalog metadata
//! document itself. This module defines the contract all backends implement:
//!
//! - Whole-object reads and writes
//! - Conditional writes with preconditions (the catalog commit protocol)
//! - Prefix listing with object metadata
//!
//! The version token is an opaque `String` so different backends can supply
//! their own semantics (S3/MinIO use `ETag`s, the in-memory backend uses a
//! numeric generation). This keeps store-specific assumptions out of the
//! catalog layer.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Precondition for conditional writes (CAS operations).
///
/// The version token is opaque - backends interpret it according to their
/// own semantics.
#[derive(Debug, Clone)]
pub enum WritePrecondition {
    /// Write only if object does not exist.
    DoesNotExist,
    /// Write only if object's version matches the given token.
    MatchesVersion(String),
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum WriteResult {
    /// Write succeeded, returns new version token.
    Success {
        /// The new version token after the write.
        version: String,
    },
    /// Precondition failed, returns current version token.
    PreconditionFailed {
        /// The current version that caused the precondition to fail.
        current_version: String,
    },
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Object version token for CAS operations.
    pub version: String,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for object storage.
///
/// All backends (S3/MinIO, memory) implement this trait. The contract is
/// designed for cloud object storage semantics: whole-object replacement,
/// no partial mutation.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes with optional precondition.
    ///
    /// Returns `WriteResult::PreconditionFailed` if the precondition is not
    /// met. Never returns an error for precondition failure - that's a
    /// normal result.
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult>;

    /// Deletes an object.
    ///
    /// Succeeds even if the object doesn't exist (idempotent).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Lists objects with the given prefix.
    ///
    /// Returns an empty vec if no objects match - a prefix with no files is
    /// a valid state, not an error.
    ///
    /// **Ordering**: Results come back in arbitrary order that may vary
    /// between backends and invocations. Callers requiring deterministic
    /// order must sort (e.g., by `path`).
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production. Uses numeric
/// versions internally (stored as strings) to simulate etag-like behavior.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    version: i64,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let mut objects = self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let current = objects.get(path);

        match precondition {
            WritePrecondition::DoesNotExist => {
                if let Some(obj) = current {
                    return Ok(WriteResult::PreconditionFailed {
                        current_version: obj.version.to_string(),
                    });
                }
            }
            WritePrecondition::MatchesVersion(expected) => {
                let expected_num: i64 = expected.parse().unwrap_or(-1);
                match current {
                    Some(obj) if obj.version != expected_num => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: obj.version.to_string(),
                        });
                    }
                    None => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: "0".to_string(),
                        });
                    }
                    _ => {}
                }
            }
            WritePrecondition::None => {}
        }

        let new_version = current.map_or(1, |o| o.version + 1);
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                version: new_version,
                last_modified: Utc::now(),
            },
        );
        drop(objects);

        Ok(WriteResult::Success {
            version: new_version.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| ObjectMeta {
                path: path.clone(),
                size: obj.data.len() as u64,
                version: obj.version.to_string(),
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects.get(path).map(|obj| ObjectMeta {
            path: path.to_string(),
            size: obj.data.len() as u64,
            version: obj.version.to_string(),
            last_modified: Some(obj.last_modified),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        let data = Bytes::from("snapshot bytes");

        let result = backend
            .put("RAW_DATA/astronauts.parquet", data.clone(), WritePrecondition::None)
            .await
            .expect("put should succeed");

        assert!(matches!(result, WriteResult::Success { ref version } if version == "1"));

        let retrieved = backend
            .get("RAW_DATA/astronauts.parquet")
            .await
            .expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("nope.parquet").await.expect_err("missing");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_object_meta_has_required_fields() {
        let backend = MemoryBackend::new();
        backend
            .put("catalog/orbital.catalog.json", Bytes::from("{}"), WritePrecondition::None)
            .await
            .expect("put should succeed");

        let meta = backend
            .head("catalog/orbital.catalog.json")
            .await
            .expect("head should succeed")
            .expect("object should exist");

        assert_eq!(meta.path, "catalog/orbital.catalog.json");
        assert_eq!(meta.size, 2);
        assert!(!meta.version.is_empty(), "must have version");
        assert!(meta.last_modified.is_some(), "must have last_modified");
    }

    #[tokio::test]
    async fn test_precondition_does_not_exist() {
        let backend = MemoryBackend::new();

        let result = backend
            .put("new.json", Bytes::from("a"), WritePrecondition::DoesNotExist)
            .await
            .expect("should succeed");
        assert!(matches!(result, WriteResult::Success { .. }));

        let result = backend
            .put("new.json", Bytes::from("b"), WritePrecondition::DoesNotExist)
            .await
            .expect("should succeed");
        assert!(matches!(result, WriteResult::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_precondition_matches_version() {
        let backend = MemoryBackend::new();

        let result = backend
            .put("gen.json", Bytes::from("v1"), WritePrecondition::None)
            .await
            .expect("should succeed");
        let first_version = match result {
            WriteResult::Success { version } => version,
            WriteResult::PreconditionFailed { .. } => panic!("expected success"),
        };

        let result = backend
            .put(
                "gen.json",
                Bytes::from("v2"),
                WritePrecondition::MatchesVersion(first_version.clone()),
            )
            .await
            .expect("should succeed");
        assert!(matches!(result, WriteResult::Success { .. }));

        // Stale version must be rejected
        let result = backend
            .put(
                "gen.json",
                Bytes::from("v3"),
                WritePrecondition::MatchesVersion(first_version),
            )
            .await
            .expect("should succeed");
        assert!(matches!(result, WriteResult::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let backend = MemoryBackend::new();

        for path in ["RAW_DATA/a.parquet", "RAW_DATA/b.parquet", "CATALOG_DATA_SNAPSHOTS/x"] {
            backend
                .put(path, Bytes::from("data"), WritePrecondition::None)
                .await
                .unwrap();
        }

        let raw = backend.list("RAW_DATA/").await.expect("should succeed");
        assert_eq!(raw.len(), 2);

        let empty = backend.list("STAGED/").await.expect("should succeed");
        assert!(empty.is_empty(), "empty listing is a valid result");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::new();

        backend
            .put("del.parquet", Bytes::from("data"), WritePrecondition::None)
            .await
            .unwrap();
        backend.delete("del.parquet").await.expect("should succeed");
        assert!(backend.head("del.parquet").await.unwrap().is_none());

        // Second delete of a missing object still succeeds
        backend.delete("del.parquet").await.expect("should succeed");
    }
}
