// Scan Routes

use crate::api::models::error::ApiError;
use crate::api::models::request::{RecentScansParams, ScanRequest};
use crate::api::models::response::{RecentScansResponse, ScanInitiatedResponse};
use crate::api::state::AppState;
use crate::cluster::{ClusterClient, KubeApiClient};
use crate::store::models::{ScanRun, ScanStatistics};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_RECENT_LIMIT: usize = 10;

/// Initiate a scan for a registered cluster. Returns as soon as the scan run
/// exists; progress is observable through `GET /scans/{id}`.
pub async fn create_scan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScanRequest>,
) -> Result<(StatusCode, Json<ScanInitiatedResponse>), ApiError> {
    let cluster = state
        .get_cluster(request.cluster_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("cluster {} not found", request.cluster_id)))?;

    info!("scan requested for cluster {}", cluster.name);

    let client: Arc<dyn ClusterClient> =
        Arc::new(KubeApiClient::new(&cluster).map_err(ApiError::from)?);
    let run = state
        .orchestrator
        .initiate_scan(&cluster, client)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(ScanInitiatedResponse {
            scan_id: run.id,
            state: run.state,
            message: "scan initiated".to_string(),
        }),
    ))
}

pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanRun>, ApiError> {
    state
        .store
        .get_scan_run(id)
        .await
        .map_err(ApiError::from)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("scan {id} not found")))
}

pub async fn recent_scans(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentScansParams>,
) -> Result<Json<RecentScansResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let scans = state
        .store
        .recent_scan_runs(limit)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(RecentScansResponse { scans }))
}

/// Run counts across the whole scan history, any cluster, any state
pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanStatistics>, ApiError> {
    state
        .store
        .scan_statistics()
        .await
        .map(Json)
        .map_err(ApiError::from)
}
