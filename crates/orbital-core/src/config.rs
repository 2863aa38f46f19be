//! Environment-driven lakehouse configuration.
//!
//! All deployment-specific knobs (bucket, prefixes, catalog location, object
//! store credentials) come from the environment; tests construct the struct
//! directly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for one Orbital lakehouse deployment.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LakeConfig {
    /// Object store bucket holding snapshot files and catalog data.
    pub bucket: String,
    /// Folder (prefix) producers write RAW snapshot files under.
    pub raw_prefix: String,
    /// Prefix the catalog writes table data files under.
    pub data_prefix: String,
    /// Object key of the catalog metadata document.
    pub catalog_key: String,
    /// Name of the attached catalog.
    pub catalog_name: String,
    /// Object store endpoint override (e.g. a MinIO URL).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access key for the object store.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret key for the object store.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Region, when the store requires one.
    #[serde(default)]
    pub region: Option<String>,
    /// Allow plain-HTTP endpoints (local MinIO).
    #[serde(default)]
    pub allow_http: bool,
    /// Use path-style bucket addressing instead of virtual-hosted style.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_path_style() -> bool {
    true
}

impl std::fmt::Debug for LakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LakeConfig")
            .field("bucket", &self.bucket)
            .field("raw_prefix", &self.raw_prefix)
            .field("data_prefix", &self.data_prefix)
            .field("catalog_key", &self.catalog_key)
            .field("catalog_name", &self.catalog_name)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("region", &self.region)
            .field("allow_http", &self.allow_http)
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl LakeConfig {
    /// Builds a configuration from the process environment.
    ///
    /// `ORBITAL_BUCKET` is required; everything else has a default or is
    /// optional:
    ///
    /// - `ORBITAL_RAW_PREFIX` (default `RAW_DATA`)
    /// - `ORBITAL_DATA_PREFIX` (default `CATALOG_DATA_SNAPSHOTS`)
    /// - `ORBITAL_CATALOG_KEY` (default `catalog/orbital.catalog.json`)
    /// - `ORBITAL_CATALOG_NAME` (default `orbital`)
    /// - `ORBITAL_S3_ENDPOINT`, `ORBITAL_S3_ACCESS_KEY`,
    ///   `ORBITAL_S3_SECRET_KEY`, `ORBITAL_S3_REGION`
    /// - `ORBITAL_S3_ALLOW_HTTP` (default `false`)
    /// - `ORBITAL_S3_PATH_STYLE` (default `true`)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `ORBITAL_BUCKET` is unset or a
    /// boolean variable does not parse.
    pub fn from_env() -> Result<Self> {
        let bucket = std::env::var("ORBITAL_BUCKET")
            .map_err(|_| Error::InvalidInput("ORBITAL_BUCKET must be set".into()))?;
        Ok(Self {
            bucket,
            raw_prefix: env_or("ORBITAL_RAW_PREFIX", "RAW_DATA"),
            data_prefix: env_or("ORBITAL_DATA_PREFIX", "CATALOG_DATA_SNAPSHOTS"),
            catalog_key: env_or("ORBITAL_CATALOG_KEY", "catalog/orbital.catalog.json"),
            catalog_name: env_or("ORBITAL_CATALOG_NAME", "orbital"),
            endpoint: std::env::var("ORBITAL_S3_ENDPOINT").ok(),
            access_key_id: std::env::var("ORBITAL_S3_ACCESS_KEY").ok(),
            secret_access_key: std::env::var("ORBITAL_S3_SECRET_KEY").ok(),
            region: std::env::var("ORBITAL_S3_REGION").ok(),
            allow_http: env_bool("ORBITAL_S3_ALLOW_HTTP", false)?,
            path_style: env_bool("ORBITAL_S3_PATH_STYLE", true)?,
        })
    }

    /// A configuration suitable for in-memory tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            bucket: "orbital-test".into(),
            raw_prefix: "RAW_DATA".into(),
            data_prefix: "CATALOG_DATA_SNAPSHOTS".into(),
            catalog_key: "catalog/orbital.catalog.json".into(),
            catalog_name: "orbital".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            region: None,
            allow_http: false,
            path_style: true,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(Error::InvalidInput(format!(
                "{key} must be a boolean, got '{other}'"
            ))),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let mut config = LakeConfig::for_testing();
        config.secret_access_key = Some("hunter2".into());
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn serde_round_trip() {
        let config = LakeConfig::for_testing();
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: LakeConfig = serde_json::from_str(&json).expect("parse");
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_defaults() {
        let config = LakeConfig::for_testing();
        assert_eq!(config.raw_prefix, "RAW_DATA");
        assert!(config.path_style);
        assert!(!config.allow_http);
    }
}
