//! Fixture builders for the sample dataset families.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{BooleanArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use orbital_core::{StorageBackend, WritePrecondition};

/// Builds an astronauts batch: `name` (nullable), `agency_name`, `in_space`.
///
/// # Panics
///
/// Panics on malformed fixture data; fixtures are test-only.
#[must_use]
pub fn astronauts_batch(names: &[Option<&str>]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("agency_name", DataType::Utf8, true),
        Field::new("in_space", DataType::Boolean, false),
    ]));
    let agencies: Vec<Option<String>> = names
        .iter()
        .map(|name| name.map(|_| "NASA".to_string()))
        .collect();
    let in_space: Vec<bool> = names.iter().map(|_| true).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(names.to_vec())),
            Arc::new(StringArray::from(agencies)),
            Arc::new(BooleanArray::from(in_space)),
        ],
    )
    .expect("astronauts fixture batch")
}

/// Builds a picture-of-the-day batch: `title`, `media_type` (nullable),
/// `url`.
///
/// # Panics
///
/// Panics on malformed fixture data; fixtures are test-only.
#[must_use]
pub fn apod_batch(rows: &[(&str, Option<&str>)]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("title", DataType::Utf8, false),
        Field::new("media_type", DataType::Utf8, true),
        Field::new("url", DataType::Utf8, true),
    ]));
    let titles: Vec<&str> = rows.iter().map(|(title, _)| *title).collect();
    let media_types: Vec<Option<&str>> = rows.iter().map(|(_, media)| *media).collect();
    let urls: Vec<Option<String>> = rows
        .iter()
        .map(|(title, _)| Some(format!("https://example.com/{title}")))
        .collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(media_types)),
            Arc::new(StringArray::from(urls)),
        ],
    )
    .expect("apod fixture batch")
}

/// Encodes a batch as a parquet snapshot file.
///
/// # Panics
///
/// Panics on encoding failure; fixtures are test-only.
#[must_use]
pub fn parquet_bytes(batch: &RecordBatch) -> Bytes {
    let mut buffer = Vec::new();
    let properties = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(properties))
        .expect("fixture parquet writer");
    writer.write(batch).expect("fixture parquet write");
    writer.close().expect("fixture parquet close");
    Bytes::from(buffer)
}

/// Writes a batch as a snapshot file under `prefix/file_name`.
///
/// # Panics
///
/// Panics when the put fails; fixtures are test-only.
pub async fn seed_snapshot_file(
    backend: &dyn StorageBackend,
    prefix: &str,
    file_name: &str,
    batch: &RecordBatch,
) {
    let path = format!("{}/{file_name}", prefix.trim_end_matches('/'));
    backend
        .put(&path, parquet_bytes(batch), WritePrecondition::None)
        .await
        .expect("seed snapshot file");
}

/// Writes a definition set matching the fixture schemas for the given
/// families (`ASTRONAUTS` and/or `NASA_APOD`).
///
/// # Panics
///
/// Panics on unknown families or filesystem failure; fixtures are
/// test-only.
pub fn write_test_definitions(root: &Path, families: &[&str]) {
    for family in families {
        let (staged, cleaned, quality) = match *family {
            "ASTRONAUTS" => (
                "SELECT name, agency_name, in_space, _source_file, _ingestion_timestamp, _record_id FROM raw.astronauts",
                "SELECT name, agency_name, in_space FROM staged.astronauts",
                "SELECT * FROM staged.astronauts WHERE name IS NULL",
            ),
            "NASA_APOD" => (
                "SELECT title, media_type, url, _source_file, _ingestion_timestamp, _record_id FROM raw.nasa_apod",
                "SELECT title, media_type, url FROM staged.nasa_apod",
                "SELECT * FROM staged.nasa_apod WHERE media_type IS NULL",
            ),
            other => panic!("no test definitions for family {other}"),
        };
        write_definition(root, "staging", &format!("STAGED_{family}"), staged);
        write_definition(
            root,
            "cleaned_aggregation",
            &format!("CLEANED_{family}"),
            cleaned,
        );
        write_definition(root, "data_quality", &format!("QUALITY_{family}"), quality);
    }
}

fn write_definition(root: &Path, group: &str, name: &str, sql: &str) {
    let dir = root.join(group);
    std::fs::create_dir_all(&dir).expect("definition dir");
    std::fs::write(dir.join(format!("{name}.sql")), sql).expect("definition file");
}
