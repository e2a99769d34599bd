// Certificate Routes - read side, always scoped through the resolver
//
// All three endpoints query records only within the scan ids selected by
// find_completed_scans, so in-flight and failed runs never leak into reported
// results or exported files.

use crate::api::models::error::ApiError;
use crate::api::models::request::{CertificateResultsParams, ExportRequest};
use crate::api::models::response::{
    CertificateResultsResponse, ExportResponse, ExportSummary, ExportedCertificate, StatsResponse,
};
use crate::api::state::AppState;
use crate::classifier::CertStatus;
use crate::store::models::CertificateFilter;
use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_RESULTS_LIMIT: usize = 100;

/// Build a record filter from query-style parameters; "all" and absence both
/// mean unfiltered.
fn parse_filter(
    status: Option<&str>,
    cluster: Option<&str>,
    search: Option<String>,
    limit: Option<usize>,
) -> Result<CertificateFilter, ApiError> {
    let status = match status {
        None | Some("all") => None,
        Some(s) => Some(s.parse::<CertStatus>().map_err(ApiError::BadRequest)?),
    };
    let cluster_name = match cluster {
        None | Some("all") => None,
        Some(name) => Some(name.to_string()),
    };

    Ok(CertificateFilter {
        status,
        cluster_name,
        search,
        limit,
    })
}

/// Dashboard totals: summed summaries of the latest completed scan per cluster
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let latest = state
        .store
        .find_completed_scans(&[])
        .await
        .map_err(ApiError::from)?;

    let mut response = StatsResponse {
        valid: 0,
        warning: 0,
        expired: 0,
        clusters: state.cluster_count().await,
    };
    for run in &latest {
        response.valid += run.summary.valid;
        response.warning += run.summary.warning;
        response.expired += run.summary.expired;
    }

    Ok(Json(response))
}

/// Filterable certificate listing over the latest completed scans
pub async fn results(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CertificateResultsParams>,
) -> Result<Json<CertificateResultsResponse>, ApiError> {
    let filter = parse_filter(
        params.status.as_deref(),
        params.cluster.as_deref(),
        params.search,
        Some(params.limit.unwrap_or(DEFAULT_RESULTS_LIMIT)),
    )?;

    let latest = state
        .store
        .find_completed_scans(&[])
        .await
        .map_err(ApiError::from)?;
    let scan_ids: Vec<Uuid> = latest.iter().map(|run| run.id).collect();

    let certificates = state
        .store
        .query_certificates(&scan_ids, &filter)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(CertificateResultsResponse { certificates }))
}

/// Bulk JSON export of the latest completed scans' certificates, downloaded
/// as an attachment. Unlimited: an export is a snapshot, not a page.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    if request.format != "json" {
        return Err(ApiError::BadRequest(
            "only the JSON export format is supported".to_string(),
        ));
    }

    let filter = parse_filter(
        request.filters.status.as_deref(),
        request.filters.cluster.as_deref(),
        request.filters.search.clone(),
        None,
    )?;

    let latest = state
        .store
        .find_completed_scans(&[])
        .await
        .map_err(ApiError::from)?;
    let scan_ids: Vec<Uuid> = latest.iter().map(|run| run.id).collect();

    let certificates: Vec<ExportedCertificate> = state
        .store
        .query_certificates(&scan_ids, &filter)
        .await
        .map_err(ApiError::from)?
        .into_iter()
        .map(ExportedCertificate::from)
        .collect();

    if certificates.is_empty() {
        return Err(ApiError::NotFound(
            "no certificates match the export criteria".to_string(),
        ));
    }

    let now = Utc::now();
    info!("exporting {} certificates", certificates.len());

    let body = ExportResponse {
        export_timestamp: now,
        export_type: "bulk_certificates",
        summary: ExportSummary::of(&certificates),
        certificates,
    };
    let disposition = format!(
        "attachment; filename=\"certificates-export-{}.json\"",
        now.timestamp_millis()
    );

    Ok((
        AppendHeaders([(header::CONTENT_DISPOSITION, disposition)]),
        Json(body),
    )
        .into_response())
}
