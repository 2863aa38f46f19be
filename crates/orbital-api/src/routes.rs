//! Dataset routes over the CLEANED layer.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use orbital_core::{Layer, TableIdent};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Fixed dataset id -> CLEANED table mapping.
pub const DATASETS: [(i64, &str); 4] = [
    (1, "ASTRONAUTS"),
    (2, "NASA_APOD"),
    (3, "NASA_DONKI"),
    (4, "NASA_EXOPLANETS"),
];

const DEFAULT_LIMIT: usize = 1000;
const MAX_LIMIT: usize = 7500;

/// One row of the dataset listing.
#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    /// Dataset identifier.
    pub id: i64,
    /// CLEANED-layer table name.
    pub dataset: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    offset: Option<usize>,
    limit: Option<usize>,
}

/// GET / - welcome message.
pub(crate) async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Orbital data API. See /datasets for the available datasets."
    }))
}

/// GET /health - liveness probe.
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /datasets - the fixed dataset listing.
pub(crate) async fn list_datasets() -> Json<Vec<DatasetInfo>> {
    Json(
        DATASETS
            .iter()
            .map(|(id, dataset)| DatasetInfo {
                id: *id,
                dataset: (*dataset).to_string(),
            })
            .collect(),
    )
}

/// GET /datasets/{id} - one page of a CLEANED dataset.
pub(crate) async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Vec<serde_json::Value>>> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 || limit > MAX_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let Some((_, table_name)) = DATASETS.iter().find(|(id, _)| *id == dataset_id) else {
        return Err(ApiError::not_found("Dataset not found"));
    };
    let ident = TableIdent::new(Layer::Cleaned, *table_name);

    tracing::info!(dataset_id, table = %ident, offset, limit, "fetching dataset page");

    let session = state.connector().open_session().await?;
    if !session.has_table(&ident) {
        session.close();
        return Err(ApiError::not_found("Dataset not found"));
    }
    let page = session.read_table_page(&ident, offset, limit).await;
    session.close();
    let (_, batches) = page?;

    let rows = batches_to_json(&batches)?;
    tracing::info!(dataset_id, rows = rows.len(), "dataset page served");
    Ok(Json(rows))
}

fn batches_to_json(batches: &[RecordBatch]) -> ApiResult<Vec<serde_json::Value>> {
    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize result rows");
        ApiError::internal()
    })?;
    writer.finish().map_err(|e| {
        tracing::error!(error = %e, "failed to finalize result rows");
        ApiError::internal()
    })?;
    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&buffer).map_err(|e| {
        tracing::error!(error = %e, "failed to decode serialized rows");
        ApiError::internal()
    })
}
