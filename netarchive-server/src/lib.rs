//! netarchive-server library
//!
//! Archive of network datasets. Owners upload networks as adjacency lists;
//! each upload is run through an [`analysis::AnalyserChain`] that derives
//! metadata (content hash, topology statistics, degree-distribution fit),
//! after which the network can be found by tag and metadata queries and
//! sampled at random.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod analysis;
pub mod api;
pub mod archive;
pub mod error;
pub mod graph;
pub mod query;
pub mod value;

use archive::Archive;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Network storage and analysis
    pub archive: Archive,
    /// Server start time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(archive: Archive) -> Self {
        Self {
            db: archive.db().clone(),
            archive,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Everything under `/api/v1` requires a bearer API key; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, patch, post};

    let protected = Router::new()
        .route("/api/v1/tags", get(api::list_tags))
        .route("/api/v1/networks", get(api::list_networks))
        .route("/api/v1/network/info/:id", get(api::network_info))
        .route("/api/v1/network/raw/:id", get(api::network_raw))
        .route(
            "/api/v1/network/:id",
            patch(api::edit_network).delete(api::delete_network),
        )
        .route(
            "/api/v1/submit",
            post(api::submit_network).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/search", post(api::search))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
