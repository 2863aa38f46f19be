//! The versioned catalog document.
//!
//! The catalog is a single JSON document at the configured metadata key. It
//! holds an ordered list of immutable snapshots; each snapshot maps fully
//! qualified table names (`LAYER.TABLE`) to the data file that currently
//! constitutes them. Every table replacement appends a new snapshot, so the
//! engine gets point-in-time reads and crash recovery for free until the
//! lifecycle manager expires superseded versions.
//!
//! Commits go through a conditional write keyed on the document's store
//! version token, so a competing writer surfaces as a commit conflict.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orbital_core::TableIdent;

use crate::error::{LakeError, Result};

/// Catalog document schema version.
pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// One table's entry inside a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    /// Object key of the parquet data file backing the table.
    pub path: String,
    /// Row count at replacement time.
    pub row_count: u64,
    /// Snapshot file the table was registered from, for RAW tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// When the table was last replaced.
    pub created_at: DateTime<Utc>,
}

/// An immutable point-in-time view of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    /// Monotonically increasing snapshot version.
    pub version: u64,
    /// When the snapshot was committed.
    pub created_at: DateTime<Utc>,
    /// Fully qualified table name -> entry.
    pub tables: BTreeMap<String, TableEntry>,
}

impl CatalogSnapshot {
    /// Looks up a table entry by identity.
    #[must_use]
    pub fn table(&self, ident: &TableIdent) -> Option<&TableEntry> {
        self.tables.get(&ident.qualified())
    }
}

/// The catalog metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    /// Document schema version.
    pub format_version: u32,
    /// Name of the attached catalog.
    pub catalog_name: String,
    /// Snapshots in commit order; never empty.
    pub snapshots: Vec<CatalogSnapshot>,
}

impl CatalogDocument {
    /// Creates a fresh catalog with an empty version-0 snapshot.
    #[must_use]
    pub fn new(catalog_name: impl Into<String>) -> Self {
        Self {
            format_version: CATALOG_FORMAT_VERSION,
            catalog_name: catalog_name.into(),
            snapshots: vec![CatalogSnapshot {
                version: 0,
                created_at: Utc::now(),
                tables: BTreeMap::new(),
            }],
        }
    }

    /// The latest committed snapshot.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the snapshot list is empty, which a
    /// well-formed document never is.
    pub fn current(&self) -> Result<&CatalogSnapshot> {
        self.snapshots
            .last()
            .ok_or_else(|| LakeError::internal("catalog document has no snapshots"))
    }

    /// The version the next commit will carry.
    ///
    /// # Errors
    ///
    /// Returns an internal error on an empty (malformed) document.
    pub fn next_version(&self) -> Result<u64> {
        Ok(self.current()?.version + 1)
    }

    /// Appends a new snapshot replacing one table, returning its version.
    ///
    /// # Errors
    ///
    /// Returns an internal error on an empty (malformed) document.
    pub fn commit_table(&mut self, ident: &TableIdent, entry: TableEntry) -> Result<u64> {
        let current = self.current()?;
        let version = current.version + 1;
        let mut tables = current.tables.clone();
        tables.insert(ident.qualified(), entry);
        self.snapshots.push(CatalogSnapshot {
            version,
            created_at: Utc::now(),
            tables,
        });
        Ok(version)
    }

    /// Drops all but the latest `keep` snapshots, returning the expired ones.
    pub fn expire_snapshots(&mut self, keep: usize) -> Vec<CatalogSnapshot> {
        let keep = keep.max(1);
        if self.snapshots.len() <= keep {
            return Vec::new();
        }
        let cutoff = self.snapshots.len() - keep;
        self.snapshots.drain(..cutoff).collect()
    }

    /// Data file paths referenced by any retained snapshot.
    #[must_use]
    pub fn referenced_paths(&self) -> HashSet<String> {
        self.snapshots
            .iter()
            .flat_map(|snapshot| snapshot.tables.values().map(|entry| entry.path.clone()))
            .collect()
    }

    /// Parses a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an internal error when the bytes are not a well-formed
    /// document; callers attach location context.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let document: Self = serde_json::from_slice(bytes)
            .map_err(|e| LakeError::internal(format!("malformed catalog document: {e}")))?;
        if document.snapshots.is_empty() {
            return Err(LakeError::internal(
                "malformed catalog document: no snapshots",
            ));
        }
        Ok(document)
    }

    /// Serializes the document to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an internal error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| LakeError::internal(format!("failed to serialize catalog: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_core::Layer;

    fn entry(path: &str, rows: u64) -> TableEntry {
        TableEntry {
            path: path.into(),
            row_count: rows,
            source_file: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_catalog_starts_at_version_zero() {
        let doc = CatalogDocument::new("orbital");
        assert_eq!(doc.current().unwrap().version, 0);
        assert!(doc.current().unwrap().tables.is_empty());
    }

    #[test]
    fn commit_table_appends_a_snapshot() {
        let mut doc = CatalogDocument::new("orbital");
        let ident = TableIdent::new(Layer::Raw, "astronauts");
        let version = doc.commit_table(&ident, entry("data/a.parquet", 5)).unwrap();
        assert_eq!(version, 1);
        assert_eq!(doc.snapshots.len(), 2);
        assert_eq!(doc.current().unwrap().table(&ident).unwrap().row_count, 5);
    }

    #[test]
    fn commit_carries_forward_other_tables() {
        let mut doc = CatalogDocument::new("orbital");
        let a = TableIdent::new(Layer::Raw, "astronauts");
        let b = TableIdent::new(Layer::Raw, "nasa_apod");
        doc.commit_table(&a, entry("data/a-v1.parquet", 5)).unwrap();
        doc.commit_table(&b, entry("data/b-v2.parquet", 3)).unwrap();
        doc.commit_table(&a, entry("data/a-v3.parquet", 6)).unwrap();

        let current = doc.current().unwrap();
        assert_eq!(current.table(&a).unwrap().path, "data/a-v3.parquet");
        assert_eq!(current.table(&b).unwrap().path, "data/b-v2.parquet");
    }

    #[test]
    fn expire_keeps_latest_snapshots() {
        let mut doc = CatalogDocument::new("orbital");
        let ident = TableIdent::new(Layer::Raw, "astronauts");
        for i in 0..4 {
            doc.commit_table(&ident, entry(&format!("data/a-v{i}.parquet"), i))
                .unwrap();
        }
        let expired = doc.expire_snapshots(1);
        assert_eq!(expired.len(), 4);
        assert_eq!(doc.snapshots.len(), 1);
        assert_eq!(doc.current().unwrap().version, 4);
    }

    #[test]
    fn expire_always_retains_at_least_one() {
        let mut doc = CatalogDocument::new("orbital");
        let expired = doc.expire_snapshots(0);
        assert!(expired.is_empty());
        assert_eq!(doc.snapshots.len(), 1);
    }

    #[test]
    fn referenced_paths_span_retained_snapshots() {
        let mut doc = CatalogDocument::new("orbital");
        let ident = TableIdent::new(Layer::Raw, "astronauts");
        doc.commit_table(&ident, entry("data/a-v1.parquet", 1)).unwrap();
        doc.commit_table(&ident, entry("data/a-v2.parquet", 2)).unwrap();

        let referenced = doc.referenced_paths();
        assert!(referenced.contains("data/a-v1.parquet"));
        assert!(referenced.contains("data/a-v2.parquet"));

        doc.expire_snapshots(1);
        let referenced = doc.referenced_paths();
        assert!(!referenced.contains("data/a-v1.parquet"));
        assert!(referenced.contains("data/a-v2.parquet"));
    }

    #[test]
    fn json_round_trip_uses_camel_case() {
        let mut doc = CatalogDocument::new("orbital");
        let ident = TableIdent::new(Layer::Staged, "nasa_apod");
        doc.commit_table(
            &ident,
            TableEntry {
                path: "data/x.parquet".into(),
                row_count: 7,
                source_file: Some("nasa_apod.parquet".into()),
                created_at: Utc::now(),
            },
        )
        .unwrap();

        let json = doc.to_json().unwrap();
        let rendered = String::from_utf8(json.clone()).unwrap();
        assert!(rendered.contains("formatVersion"));
        assert!(rendered.contains("rowCount"));

        let parsed = CatalogDocument::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(CatalogDocument::from_json(b"not json").is_err());
        assert!(
            CatalogDocument::from_json(br#"{"formatVersion":1,"catalogName":"x","snapshots":[]}"#)
                .is_err()
        );
    }
}
