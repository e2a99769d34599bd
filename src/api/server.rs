// API Server Implementation

use crate::api::{config::ApiConfig, routes, state::AppState};
use crate::store::ScanStore;
use anyhow::Result;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API Server
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, store: Arc<dyn ScanStore>) -> Self {
        let state = Arc::new(AppState::new(config.clone(), store));
        Self { config, state }
    }

    fn build_router(&self) -> Router {
        let api_routes = Router::new()
            // Cluster registry
            .route("/clusters", post(routes::clusters::create_cluster))
            .route("/clusters", get(routes::clusters::list_clusters))
            .route("/clusters/:id", get(routes::clusters::get_cluster))
            .route("/clusters/:id", put(routes::clusters::update_cluster))
            .route("/clusters/:id", delete(routes::clusters::delete_cluster))
            .route("/clusters/:id/test", post(routes::clusters::test_cluster))
            // Scans
            .route("/scans", post(routes::scans::create_scan))
            .route("/scans/recent", get(routes::scans::recent_scans))
            .route("/scans/statistics", get(routes::scans::statistics))
            .route("/scans/:id", get(routes::scans::get_scan))
            // Certificates (read side, resolver-scoped)
            .route("/certificates/stats", get(routes::certificates::stats))
            .route("/certificates/results", get(routes::certificates::results))
            .route("/certificates/export", post(routes::certificates::export));

        Router::new()
            .nest("/api/v1", api_routes)
            .route("/health", get(routes::health::health_check))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let app = self.build_router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("certwatch API server listening on {}", addr);
        info!("health check endpoint: http://{}/health", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
