//! Parquet encode/decode helpers.
//!
//! Snapshot files and catalog data files are whole parquet objects that fit
//! in memory; both directions go through byte buffers rather than streaming.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;

use crate::error::Result;

/// Decodes parquet bytes into record batches.
///
/// Returns the file schema even when the file holds zero rows.
///
/// # Errors
///
/// Returns a parquet error when the bytes are not a well-formed file.
pub fn read_batches(bytes: Bytes) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema: SchemaRef = builder.schema().clone();
    let reader = builder.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok((schema, batches))
}

/// Encodes record batches into a parquet byte buffer.
///
/// # Errors
///
/// Returns a parquet error when encoding fails.
pub fn write_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Vec<u8>> {
    let properties = WriterProperties::builder().build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema.clone(), Some(properties))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(buffer)
}

/// Total rows across a batch slice.
#[must_use]
pub fn row_count(batches: &[RecordBatch]) -> u64 {
    batches.iter().map(|b| b.num_rows() as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("value", DataType::Int64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
                Arc::new(Int64Array::from(vec![1, 2, 3])),
            ],
        )
        .expect("batch")
    }

    #[test]
    fn encode_then_decode_preserves_rows_and_schema() {
        let batch = sample_batch();
        let schema = batch.schema();
        let bytes = write_batches(&schema, std::slice::from_ref(&batch)).expect("encode");

        let (decoded_schema, decoded) = read_batches(Bytes::from(bytes)).expect("decode");
        assert_eq!(decoded_schema.fields().len(), 2);
        assert_eq!(row_count(&decoded), 3);
    }

    #[test]
    fn zero_row_file_keeps_its_schema() {
        let batch = sample_batch();
        let schema = batch.schema();
        let bytes = write_batches(&schema, &[]).expect("encode");

        let (decoded_schema, decoded) = read_batches(Bytes::from(bytes)).expect("decode");
        assert_eq!(decoded_schema.field(0).name(), "name");
        assert!(decoded.is_empty() || row_count(&decoded) == 0);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(read_batches(Bytes::from_static(b"not parquet")).is_err());
    }
}
