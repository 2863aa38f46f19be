//! Router construction and server entry point.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use orbital_lake::Connector;

use crate::routes;

/// Shared state for the serving API.
pub struct AppState {
    connector: Connector,
    origins: Vec<String>,
}

impl AppState {
    /// Creates state over a catalog connector.
    #[must_use]
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            origins: Vec::new(),
        }
    }

    /// Restricts CORS to the given origins (default: any origin).
    #[must_use]
    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.origins = origins;
        self
    }

    /// The catalog connector requests read through.
    #[must_use]
    pub fn connector(&self) -> &Connector {
        &self.connector
    }
}

/// Builds the API router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = if state.origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/datasets", get(routes::list_datasets))
        .route("/datasets/{dataset_id}", get(routes::get_dataset))
        .layer(cors)
        .with_state(state)
}

/// Serves the API until the process is stopped.
///
/// # Errors
///
/// Returns an I/O error when the listener cannot bind or the server fails.
pub async fn serve(addr: &str, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "serving Orbital data API");
    axum::serve(listener, router(state)).await
}
