//! Layer registrar: snapshot files in, catalog tables out.
//!
//! Discovers parquet snapshot files under a logical folder and materializes
//! one table per file in the target layer, stamping provenance columns.
//!
//! Ingestion is best-effort per file: one unreadable file is logged,
//! recorded in the summary, and does not stop the remaining files. This is
//! deliberately the opposite of the transform runner's fail-fast policy -
//! source files fail independently of each other, transformations do not.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::Serialize;

use orbital_core::{Layer, TableIdent, table_name_from_file};

use crate::error::Result;
use crate::parquet_io;
use crate::session::Session;

/// Name of the provenance column recording the originating snapshot file.
pub const SOURCE_FILE_COLUMN: &str = "_source_file";
/// Name of the provenance column recording the registration wall-clock time.
pub const INGESTION_TIMESTAMP_COLUMN: &str = "_ingestion_timestamp";
/// Name of the provenance column holding the dense row sequence number.
pub const RECORD_ID_COLUMN: &str = "_record_id";

/// One successfully registered table.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedTable {
    /// Table that was replaced.
    pub table: TableIdent,
    /// Snapshot file it was registered from.
    pub source_file: String,
    /// Rows in the replaced table.
    pub row_count: u64,
}

/// One snapshot file that could not be registered.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionFailure {
    /// Object path of the failing file.
    pub file: String,
    /// Why it failed.
    pub message: String,
}

/// Outcome of one layer registration pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionSummary {
    /// Tables registered, in listing order.
    pub tables: Vec<IngestedTable>,
    /// Files that failed, in listing order.
    pub failures: Vec<IngestionFailure>,
}

impl IngestionSummary {
    /// True when the pass saw no files at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.failures.is_empty()
    }

    /// True when at least one file failed to register.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Registers snapshot files from one store folder into one layer.
#[derive(Debug, Clone)]
pub struct LayerRegistrar {
    folder: String,
    target: Layer,
}

impl LayerRegistrar {
    /// Creates a registrar for a store folder and target layer.
    #[must_use]
    pub fn new(folder: impl Into<String>, target: Layer) -> Self {
        Self {
            folder: folder.into(),
            target,
        }
    }

    /// Registers every parquet snapshot file under the folder.
    ///
    /// Listing is sorted by path so name collisions resolve
    /// deterministically: the last file in sorted order wins.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the listing itself fails; per-file
    /// failures land in the summary instead.
    pub async fn register(&self, session: &mut Session) -> Result<IngestionSummary> {
        let prefix = format!("{}/", self.folder.trim_end_matches('/'));
        let mut listing = session.backend().list(&prefix).await?;
        listing.retain(|meta| meta.path.ends_with(".parquet"));
        listing.sort_by(|a, b| a.path.cmp(&b.path));

        if listing.is_empty() {
            tracing::info!(folder = %self.folder, "no snapshot files found; nothing to register");
            return Ok(IngestionSummary::default());
        }
        tracing::info!(
            folder = %self.folder,
            files = listing.len(),
            layer = %self.target,
            "registering snapshot files"
        );

        let mut summary = IngestionSummary::default();
        for meta in listing {
            match self.ingest_file(session, &meta.path).await {
                Ok(ingested) => {
                    tracing::info!(
                        file = %meta.path,
                        table = %ingested.table,
                        rows = ingested.row_count,
                        "registered snapshot file"
                    );
                    summary.tables.push(ingested);
                }
                Err(e) => {
                    tracing::error!(file = %meta.path, error = %e, "failed to register snapshot file");
                    summary.failures.push(IngestionFailure {
                        file: meta.path,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    async fn ingest_file(&self, session: &mut Session, path: &str) -> Result<IngestedTable> {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let table = TableIdent::new(self.target, table_name_from_file(&file_name));
        let bytes = session.backend().get(path).await?;
        let (schema, batches) = parquet_io::read_batches(bytes)?;
        let (schema, batches) = stamp_provenance(&schema, &batches, &file_name, Utc::now())?;
        let entry = session
            .replace_table(&table, schema, batches, Some(file_name.clone()))
            .await?;
        Ok(IngestedTable {
            table,
            source_file: file_name,
            row_count: entry.row_count,
        })
    }
}

/// Appends the three provenance columns to every batch.
///
/// `_record_id` is a dense 1-based sequence across the whole file, assigned
/// at registration time; it is not stable across re-ingestion.
fn stamp_provenance(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    source_file: &str,
    ingested_at: DateTime<Utc>,
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(SOURCE_FILE_COLUMN, DataType::Utf8, false)));
    fields.push(Arc::new(Field::new(
        INGESTION_TIMESTAMP_COLUMN,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )));
    fields.push(Arc::new(Field::new(RECORD_ID_COLUMN, DataType::Int64, false)));
    let stamped: SchemaRef = Arc::new(Schema::new(fields));

    let timestamp = ingested_at.timestamp_micros();
    let mut next_id: i64 = 1;
    let mut out = Vec::with_capacity(batches.len());
    for batch in batches {
        let rows = batch.num_rows();
        let mut columns = batch.columns().to_vec();
        columns.push(Arc::new(StringArray::from(vec![source_file; rows])) as ArrayRef);
        columns.push(Arc::new(
            TimestampMicrosecondArray::from(vec![timestamp; rows]).with_timezone("UTC"),
        ) as ArrayRef);
        let ids: Vec<i64> = (next_id..next_id + rows as i64).collect();
        next_id += rows as i64;
        columns.push(Arc::new(Int64Array::from(ids)) as ArrayRef);
        out.push(RecordBatch::try_new(stamped.clone(), columns)?);
    }
    Ok((stamped, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn plain_batch(rows: usize) -> (SchemaRef, RecordBatch) {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new(
            "name",
            DataType::Utf8,
            true,
        )]));
        let names: Vec<Option<String>> = (0..rows).map(|i| Some(format!("row{i}"))).collect();
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(StringArray::from(names))])
                .expect("batch");
        (schema, batch)
    }

    #[test]
    fn provenance_columns_are_appended() {
        let (schema, batch) = plain_batch(3);
        let (stamped, batches) =
            stamp_provenance(&schema, &[batch], "astronauts.parquet", Utc::now()).expect("stamp");

        assert_eq!(stamped.fields().len(), 4);
        assert_eq!(stamped.field(1).name(), SOURCE_FILE_COLUMN);
        assert_eq!(stamped.field(2).name(), INGESTION_TIMESTAMP_COLUMN);
        assert_eq!(stamped.field(3).name(), RECORD_ID_COLUMN);
        assert_eq!(batches[0].num_rows(), 3);

        let sources = batches[0]
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(sources.value(0), "astronauts.parquet");
    }

    #[test]
    fn record_ids_are_dense_across_batches() {
        let (schema, first) = plain_batch(2);
        let (_, second) = plain_batch(3);
        let (_, batches) =
            stamp_provenance(&schema, &[first, second], "f.parquet", Utc::now()).expect("stamp");

        let first_ids = batches[0]
            .column(3)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        let second_ids = batches[1]
            .column(3)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(first_ids.values().as_ref(), &[1, 2]);
        assert_eq!(second_ids.values().as_ref(), &[3, 4, 5]);
    }

    #[test]
    fn empty_file_stamps_schema_only() {
        let (schema, _) = plain_batch(0);
        let (stamped, batches) =
            stamp_provenance(&schema, &[], "empty.parquet", Utc::now()).expect("stamp");
        assert_eq!(stamped.fields().len(), 4);
        assert!(batches.is_empty());
    }
}
