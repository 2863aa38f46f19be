//! S3-compatible storage backend.
//!
//! Wraps the `object_store` crate's S3 client so MinIO and AWS deployments
//! share one code path. Building the client is pure configuration - no I/O
//! happens until the first operation. Conditional writes map onto the
//! store's native `If-None-Match`/`If-Match` semantics, with `ETag`s as the
//! opaque version tokens.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload, UpdateVersion};

use crate::config::LakeConfig;
use crate::error::{Error, Result};
use crate::storage::{ObjectMeta, StorageBackend, WritePrecondition, WriteResult};

/// Storage backend over an S3-compatible object store.
#[derive(Debug)]
pub struct S3Backend {
    inner: AmazonS3,
}

impl S3Backend {
    /// Builds a backend from lakehouse configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` when the client cannot be
    /// configured (missing credentials, malformed endpoint).
    pub fn from_config(config: &LakeConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::InvalidInput("bucket must not be empty".into()));
        }
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_allow_http(config.allow_http)
            .with_virtual_hosted_style_request(!config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key_id) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_access_key);
        }
        builder = builder.with_region(config.region.as_deref().unwrap_or("us-east-1"));
        let inner = builder.build().map_err(|e| {
            Error::store_unavailable_with_source("failed to configure S3 client", e)
        })?;
        Ok(Self { inner })
    }
}

fn map_store_error(path: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound(format!("object not found: {path}")),
        other => Error::store_unavailable_with_source(format!("operation on {path} failed"), other),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = StorePath::from(path);
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(|e| map_store_error(path, e))?;
        result.bytes().await.map_err(|e| map_store_error(path, e))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let location = StorePath::from(path);
        let payload = PutPayload::from(data);
        let mode = match precondition {
            WritePrecondition::None => PutMode::Overwrite,
            WritePrecondition::DoesNotExist => PutMode::Create,
            WritePrecondition::MatchesVersion(version) => PutMode::Update(UpdateVersion {
                e_tag: Some(version),
                version: None,
            }),
        };
        let outcome = self
            .inner
            .put_opts(&location, payload, PutOptions::from(mode))
            .await;
        match outcome {
            Ok(result) => Ok(WriteResult::Success {
                version: result.e_tag.unwrap_or_default(),
            }),
            Err(
                object_store::Error::AlreadyExists { .. } | object_store::Error::Precondition { .. },
            ) => {
                let current_version = self
                    .head(path)
                    .await?
                    .map(|meta| meta.version)
                    .unwrap_or_default();
                Ok(WriteResult::PreconditionFailed { current_version })
            }
            Err(e) => Err(map_store_error(path, e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let location = StorePath::from(path);
        match self.inner.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store_error(path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let location = StorePath::from(prefix);
        let entries: Vec<object_store::ObjectMeta> = self
            .inner
            .list(Some(&location))
            .try_collect()
            .await
            .map_err(|e| map_store_error(prefix, e))?;
        Ok(entries
            .into_iter()
            .map(|meta| ObjectMeta {
                path: meta.location.to_string(),
                size: meta.size,
                version: meta.e_tag.unwrap_or_default(),
                last_modified: Some(meta.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let location = StorePath::from(path);
        match self.inner.head(&location).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                path: meta.location.to_string(),
                size: meta.size,
                version: meta.e_tag.unwrap_or_default(),
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_store_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_minio_style_config() {
        let mut config = LakeConfig::for_testing();
        config.endpoint = Some("http://localhost:9000".into());
        config.access_key_id = Some("minioadmin".into());
        config.secret_access_key = Some("minioadmin".into());
        config.allow_http = true;

        // Pure configuration: no I/O until the first operation.
        S3Backend::from_config(&config).expect("client should build");
    }

    #[test]
    fn missing_bucket_is_a_config_error() {
        let mut config = LakeConfig::for_testing();
        config.bucket = String::new();
        assert!(S3Backend::from_config(&config).is_err());
    }
}
