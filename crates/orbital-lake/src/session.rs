//! Catalog connector and session.
//!
//! A [`Connector`] attaches the named catalog at the configured metadata
//! location; an open [`Session`] owns the query engine for the duration of
//! one sync run. The session keeps three things in lockstep:
//!
//! 1. the catalog document (and its store version token, for conditional
//!    commits),
//! 2. the data files in object storage,
//! 3. the tables registered in the query engine.
//!
//! Table replacement is atomic from a reader's point of view: the data file
//! is written first, then the catalog commit makes it visible, then the
//! query engine's registration is refreshed. A failed commit leaves the
//! previous table intact.
//!
//! The connector counts open sessions so release is observable; the
//! orchestrator closes its session on every exit path, and a dropped
//! session releases itself (with a warning) as a backstop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;

use orbital_core::{
    LakeConfig, Layer, S3Backend, StorageBackend, TableIdent, WritePrecondition, WriteResult,
};

use crate::catalog::{CatalogDocument, CatalogSnapshot, TableEntry};
use crate::error::{LakeError, Result};
use crate::parquet_io;

/// Opens sessions against the catalog at one metadata location.
#[derive(Clone)]
pub struct Connector {
    backend: Arc<dyn StorageBackend>,
    config: LakeConfig,
    open_sessions: Arc<AtomicUsize>,
}

impl Connector {
    /// Creates a connector over an explicit storage backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, config: LakeConfig) -> Self {
        Self {
            backend,
            config,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a connector with an S3 backend built from the configuration.
    ///
    /// Building the client applies credentials/endpoint/path-style options
    /// but performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns an error when the S3 client cannot be configured.
    pub fn from_config(config: LakeConfig) -> Result<Self> {
        let backend = Arc::new(S3Backend::from_config(&config)?);
        Ok(Self::new(backend, config))
    }

    /// The configuration this connector was built with.
    #[must_use]
    pub fn config(&self) -> &LakeConfig {
        &self.config
    }

    /// The storage backend this connector talks to.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    /// Number of sessions currently open against this connector.
    #[must_use]
    pub fn open_session_count(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Opens a session: attaches the catalog, creates the layer schemas,
    /// and registers every table of the current catalog snapshot.
    ///
    /// A missing catalog document is initialized empty on first attach.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::CatalogAttach`] when the metadata location is
    /// unreachable or holds a corrupt document.
    pub async fn open_session(&self) -> Result<Session> {
        let (catalog, catalog_version) = self.attach().await?;
        let mut session = Session {
            ctx: SessionContext::new(),
            backend: self.backend.clone(),
            config: self.config.clone(),
            catalog,
            catalog_version,
            open_sessions: self.open_sessions.clone(),
            closed: false,
        };
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        session.ensure_schemas().await?;
        session.register_catalog_tables().await?;
        let current = session.catalog.current()?;
        tracing::info!(
            catalog = %self.config.catalog_name,
            snapshot = current.version,
            tables = current.tables.len(),
            "catalog attached"
        );
        Ok(session)
    }

    async fn attach(&self) -> Result<(CatalogDocument, Option<String>)> {
        let key = &self.config.catalog_key;
        match self.backend.get(key).await {
            Ok(bytes) => {
                let document = CatalogDocument::from_json(&bytes)
                    .map_err(|e| LakeError::catalog_attach(key, e.to_string()))?;
                let token = self
                    .backend
                    .head(key)
                    .await
                    .map_err(|e| LakeError::catalog_attach(key, e.to_string()))?
                    .map(|meta| meta.version);
                Ok((document, token))
            }
            Err(e) if e.is_not_found() => {
                let document = CatalogDocument::new(&self.config.catalog_name);
                let bytes = document.to_json()?;
                let outcome = self
                    .backend
                    .put(key, bytes.into(), WritePrecondition::DoesNotExist)
                    .await
                    .map_err(|e| LakeError::catalog_attach(key, e.to_string()))?;
                match outcome {
                    WriteResult::Success { version } => {
                        tracing::info!(catalog = %self.config.catalog_name, key, "initialized empty catalog");
                        Ok((document, Some(version)))
                    }
                    WriteResult::PreconditionFailed { .. } => Err(LakeError::catalog_attach(
                        key,
                        "concurrent catalog initialization detected",
                    )),
                }
            }
            Err(e) => Err(LakeError::catalog_attach(key, e.to_string())),
        }
    }
}

/// One open session against the attached catalog.
///
/// Exclusively owned by its caller for the session's lifetime; release via
/// [`Session::close`].
pub struct Session {
    ctx: SessionContext,
    backend: Arc<dyn StorageBackend>,
    config: LakeConfig,
    catalog: CatalogDocument,
    catalog_version: Option<String>,
    open_sessions: Arc<AtomicUsize>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("catalog_version", &self.catalog_version)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// The storage backend behind this session.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    /// The configuration this session was opened with.
    #[must_use]
    pub fn config(&self) -> &LakeConfig {
        &self.config
    }

    /// The catalog document as of the last commit seen by this session.
    #[must_use]
    pub fn catalog(&self) -> &CatalogDocument {
        &self.catalog
    }

    /// Whether the current snapshot holds the given table.
    #[must_use]
    pub fn has_table(&self, ident: &TableIdent) -> bool {
        self.catalog
            .current()
            .is_ok_and(|snapshot| snapshot.table(ident).is_some())
    }

    /// The current snapshot's entry for a table, if registered.
    #[must_use]
    pub fn table_entry(&self, ident: &TableIdent) -> Option<&TableEntry> {
        self.catalog.current().ok().and_then(|s| s.table(ident))
    }

    /// Runs a SQL query against the registered layers.
    ///
    /// # Errors
    ///
    /// Returns a query error when planning or execution fails.
    pub async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        Ok(self.query_with_schema(sql).await?.1)
    }

    /// Runs a SQL query, returning the result schema alongside the batches.
    ///
    /// The schema is available even for empty results, which matters for
    /// materializing zero-row tables.
    ///
    /// # Errors
    ///
    /// Returns a query error when planning or execution fails.
    pub async fn query_with_schema(&self, sql: &str) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let df = self.ctx.sql(sql).await?;
        let schema: SchemaRef = Arc::new(Schema::from(df.schema()));
        let batches = df.collect().await?;
        Ok((schema, batches))
    }

    /// Reads one page of a table, for the query-serving collaborator.
    ///
    /// # Errors
    ///
    /// Returns a query error when the table is not registered.
    pub async fn read_table_page(
        &self,
        ident: &TableIdent,
        offset: usize,
        limit: usize,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let reference = TableReference::partial(ident.layer.sql_schema(), ident.sql_name());
        let df = self.ctx.table(reference).await?.limit(offset, Some(limit))?;
        let schema: SchemaRef = Arc::new(Schema::from(df.schema()));
        let batches = df.collect().await?;
        Ok((schema, batches))
    }

    /// Atomically replaces a table with the given contents.
    ///
    /// Writes the data file, commits a new catalog snapshot via conditional
    /// write, and refreshes the query engine's registration. On a failed
    /// commit the previous table version stays visible.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the data write fails, or
    /// [`LakeError::CommitConflict`] when another writer raced the commit.
    pub async fn replace_table(
        &mut self,
        ident: &TableIdent,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        source_file: Option<String>,
    ) -> Result<TableEntry> {
        let version = self.catalog.next_version()?;
        let bytes = parquet_io::write_batches(&schema, &batches)?;
        let path = format!(
            "{}/{}/{}/v{version}.parquet",
            self.config.data_prefix, ident.layer, ident.name
        );
        match self
            .backend
            .put(&path, bytes.into(), WritePrecondition::None)
            .await?
        {
            WriteResult::Success { .. } => {}
            WriteResult::PreconditionFailed { .. } => {
                return Err(LakeError::internal(
                    "unconditional data write reported a failed precondition",
                ));
            }
        }

        let entry = TableEntry {
            path,
            row_count: parquet_io::row_count(&batches),
            source_file,
            created_at: Utc::now(),
        };
        self.catalog.commit_table(ident, entry.clone())?;
        if let Err(e) = self.commit_document().await {
            // Keep the in-memory view mirroring the store.
            self.catalog.snapshots.pop();
            return Err(e);
        }
        self.register_in_context(ident, schema, batches)?;
        tracing::debug!(
            table = %ident,
            snapshot = version,
            rows = entry.row_count,
            "table replaced"
        );
        Ok(entry)
    }

    /// Expires all but the latest `keep` catalog snapshots and commits the
    /// trimmed document, returning the expired snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::CommitConflict`] when another writer raced the
    /// commit; the expired snapshots are restored in that case.
    pub async fn expire_snapshots(&mut self, keep: usize) -> Result<Vec<CatalogSnapshot>> {
        let expired = self.catalog.expire_snapshots(keep);
        if expired.is_empty() {
            return Ok(expired);
        }
        if let Err(e) = self.commit_document().await {
            let retained = std::mem::take(&mut self.catalog.snapshots);
            self.catalog.snapshots = expired;
            self.catalog.snapshots.extend(retained);
            return Err(e);
        }
        Ok(expired)
    }

    /// Releases the session. Must be called exactly once per open.
    pub fn close(mut self) {
        self.release();
    }

    async fn ensure_schemas(&mut self) -> Result<()> {
        for layer in Layer::ALL {
            let statement = format!("CREATE SCHEMA IF NOT EXISTS {}", layer.sql_schema());
            self.ctx.sql(&statement).await?.collect().await?;
        }
        Ok(())
    }

    async fn register_catalog_tables(&mut self) -> Result<()> {
        let entries: Vec<(String, String)> = self
            .catalog
            .current()?
            .tables
            .iter()
            .map(|(qualified, entry)| (qualified.clone(), entry.path.clone()))
            .collect();
        for (qualified, path) in entries {
            let ident = TableIdent::parse(&qualified)?;
            let bytes = self.backend.get(&path).await?;
            let (schema, batches) = parquet_io::read_batches(bytes)?;
            self.register_in_context(&ident, schema, batches)?;
        }
        Ok(())
    }

    fn register_in_context(
        &mut self,
        ident: &TableIdent,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<()> {
        let reference = TableReference::partial(ident.layer.sql_schema(), ident.sql_name());
        let table = MemTable::try_new(schema, vec![batches])?;
        self.ctx.deregister_table(reference.clone())?;
        self.ctx.register_table(reference, Arc::new(table))?;
        Ok(())
    }

    async fn commit_document(&mut self) -> Result<()> {
        let bytes = self.catalog.to_json()?;
        let precondition = match &self.catalog_version {
            Some(token) => WritePrecondition::MatchesVersion(token.clone()),
            None => WritePrecondition::DoesNotExist,
        };
        let outcome = self
            .backend
            .put(&self.config.catalog_key, bytes.into(), precondition)
            .await?;
        match outcome {
            WriteResult::Success { version } => {
                self.catalog_version = Some(version);
                Ok(())
            }
            WriteResult::PreconditionFailed { current_version } => Err(LakeError::CommitConflict {
                message: format!(
                    "catalog at {} was modified concurrently (store version {current_version})",
                    self.config.catalog_key
                ),
            }),
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(catalog = %self.config.catalog_name, "catalog session released");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                catalog = %self.config.catalog_name,
                "catalog session dropped without explicit close"
            );
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field};
    use bytes::Bytes;
    use orbital_core::MemoryBackend;

    fn test_connector() -> Connector {
        Connector::new(Arc::new(MemoryBackend::new()), LakeConfig::for_testing())
    }

    fn sample_table() -> (SchemaRef, Vec<RecordBatch>) {
        let schema: SchemaRef = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("value", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("alpha"), Some("beta")])),
                Arc::new(Int64Array::from(vec![1, 2])),
            ],
        )
        .expect("batch");
        (schema, vec![batch])
    }

    #[tokio::test]
    async fn open_initializes_an_empty_catalog() {
        let connector = test_connector();
        let session = connector.open_session().await.expect("open");
        assert_eq!(session.catalog().current().unwrap().version, 0);
        session.close();

        let stored = connector
            .backend()
            .get(&connector.config().catalog_key)
            .await
            .expect("catalog document written");
        CatalogDocument::from_json(&stored).expect("parseable");
    }

    #[tokio::test]
    async fn corrupt_catalog_is_an_attach_error() {
        let backend = Arc::new(MemoryBackend::new());
        let config = LakeConfig::for_testing();
        backend
            .put(
                &config.catalog_key,
                Bytes::from_static(b"corrupt"),
                WritePrecondition::None,
            )
            .await
            .unwrap();
        let connector = Connector::new(backend, config);
        let err = connector.open_session().await.expect_err("attach fails");
        assert!(matches!(err, LakeError::CatalogAttach { .. }));
        assert_eq!(connector.open_session_count(), 0);
    }

    #[tokio::test]
    async fn session_count_tracks_open_and_close() {
        let connector = test_connector();
        assert_eq!(connector.open_session_count(), 0);
        let session = connector.open_session().await.expect("open");
        assert_eq!(connector.open_session_count(), 1);
        session.close();
        assert_eq!(connector.open_session_count(), 0);
    }

    #[tokio::test]
    async fn dropped_session_still_releases() {
        let connector = test_connector();
        {
            let _session = connector.open_session().await.expect("open");
            assert_eq!(connector.open_session_count(), 1);
        }
        assert_eq!(connector.open_session_count(), 0);
    }

    #[tokio::test]
    async fn replace_table_is_queryable_and_committed() {
        let connector = test_connector();
        let mut session = connector.open_session().await.expect("open");
        let (schema, batches) = sample_table();
        let ident = TableIdent::new(Layer::Raw, "astronauts");

        let entry = session
            .replace_table(&ident, schema, batches, Some("astronauts.parquet".into()))
            .await
            .expect("replace");
        assert_eq!(entry.row_count, 2);

        let rows = session
            .query("SELECT name FROM raw.astronauts ORDER BY value")
            .await
            .expect("query");
        assert_eq!(parquet_io::row_count(&rows), 2);

        // Visible to a fresh session (committed, not just in-memory)
        session.close();
        let reopened = connector.open_session().await.expect("reopen");
        assert!(reopened.has_table(&ident));
        let rows = reopened
            .query("SELECT * FROM raw.astronauts")
            .await
            .expect("query after reopen");
        assert_eq!(parquet_io::row_count(&rows), 2);
        reopened.close();
    }

    #[tokio::test]
    async fn replace_zero_row_table_keeps_schema() {
        let connector = test_connector();
        let mut session = connector.open_session().await.expect("open");
        let (schema, _) = sample_table();
        let ident = TableIdent::new(Layer::Staged, "astronauts");

        session
            .replace_table(&ident, schema, Vec::new(), None)
            .await
            .expect("replace empty");
        let rows = session
            .query("SELECT name, value FROM staged.astronauts")
            .await
            .expect("query empty table");
        assert_eq!(parquet_io::row_count(&rows), 0);
        session.close();
    }

    #[tokio::test]
    async fn concurrent_catalog_write_is_a_commit_conflict() {
        let connector = test_connector();
        let mut session = connector.open_session().await.expect("open");

        // Another writer replaces the catalog document behind our back.
        let foreign = CatalogDocument::new("intruder");
        connector
            .backend()
            .put(
                &connector.config().catalog_key,
                Bytes::from(foreign.to_json().unwrap()),
                WritePrecondition::None,
            )
            .await
            .unwrap();

        let (schema, batches) = sample_table();
        let ident = TableIdent::new(Layer::Raw, "astronauts");
        let err = session
            .replace_table(&ident, schema, batches, None)
            .await
            .expect_err("commit must conflict");
        assert!(matches!(err, LakeError::CommitConflict { .. }));
        // In-memory view rolled back
        assert!(!session.has_table(&ident));
        session.close();
    }

    #[tokio::test]
    async fn expire_snapshots_commits_trimmed_document() {
        let connector = test_connector();
        let mut session = connector.open_session().await.expect("open");
        let ident = TableIdent::new(Layer::Raw, "astronauts");
        for _ in 0..3 {
            let (schema, batches) = sample_table();
            session
                .replace_table(&ident, schema, batches, None)
                .await
                .expect("replace");
        }
        assert_eq!(session.catalog().snapshots.len(), 4);

        let expired = session.expire_snapshots(1).await.expect("expire");
        assert_eq!(expired.len(), 3);
        session.close();

        let reopened = connector.open_session().await.expect("reopen");
        assert_eq!(reopened.catalog().snapshots.len(), 1);
        assert_eq!(reopened.catalog().current().unwrap().version, 3);
        reopened.close();
    }
}
