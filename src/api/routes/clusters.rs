// Cluster Routes - CRUD over the monitored-cluster registry

use crate::api::models::error::ApiError;
use crate::api::models::request::{CreateClusterRequest, UpdateClusterRequest};
use crate::api::models::response::{ClustersResponse, ConnectionTestResponse};
use crate::api::state::AppState;
use crate::cluster::{ClusterClient, ClusterConfig, KubeApiClient};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateClusterRequest>,
) -> Result<(StatusCode, Json<ClusterConfig>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("cluster name cannot be empty".to_string()));
    }
    if request.api_url.trim().is_empty() {
        return Err(ApiError::BadRequest("cluster API URL cannot be empty".to_string()));
    }

    let cluster = ClusterConfig {
        auto_scan: request.auto_scan,
        ..ClusterConfig::new(request.name, request.api_url, request.token, request.namespaces)
    };
    info!("registered cluster {} ({})", cluster.name, cluster.id);

    state.register_cluster(cluster.clone()).await;
    Ok((StatusCode::CREATED, Json(cluster)))
}

pub async fn list_clusters(State(state): State<Arc<AppState>>) -> Json<ClustersResponse> {
    Json(ClustersResponse {
        clusters: state.list_clusters().await,
    })
}

pub async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClusterConfig>, ApiError> {
    state
        .get_cluster(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("cluster {id} not found")))
}

pub async fn update_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClusterRequest>,
) -> Result<Json<ClusterConfig>, ApiError> {
    let mut cluster = state
        .get_cluster(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("cluster {id} not found")))?;

    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("cluster name cannot be empty".to_string()));
        }
        cluster.name = name;
    }
    if let Some(api_url) = request.api_url {
        if api_url.trim().is_empty() {
            return Err(ApiError::BadRequest("cluster API URL cannot be empty".to_string()));
        }
        cluster.api_url = api_url;
    }
    if let Some(token) = request.token {
        cluster.token = token;
    }
    if let Some(namespaces) = request.namespaces {
        cluster.namespaces = namespaces;
    }
    if let Some(auto_scan) = request.auto_scan {
        cluster.auto_scan = auto_scan;
    }

    info!("updated cluster {} ({})", cluster.name, cluster.id);
    state.register_cluster(cluster.clone()).await;
    Ok(Json(cluster))
}

/// Probe the cluster API with the stored credentials and report the visible
/// namespaces. A failed probe is the caller's problem, not the server's.
pub async fn test_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionTestResponse>, ApiError> {
    let cluster = state
        .get_cluster(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("cluster {id} not found")))?;

    let client = KubeApiClient::new(&cluster).map_err(ApiError::from)?;
    match client.list_namespaces().await {
        Ok(namespaces) => {
            info!("connection test succeeded for cluster {}", cluster.name);
            Ok(Json(ConnectionTestResponse {
                success: true,
                message: "connection successful".to_string(),
                namespaces,
            }))
        }
        Err(e) => {
            info!("connection test failed for cluster {}: {}", cluster.name, e);
            Err(ApiError::BadRequest(e.to_string()))
        }
    }
}

pub async fn delete_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.remove_cluster(id).await {
        Some(cluster) => {
            info!("removed cluster {} ({})", cluster.name, cluster.id);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound(format!("cluster {id} not found"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::ApiConfig;
    use crate::store::MemoryStore;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            ApiConfig::default(),
            Arc::new(MemoryStore::new()),
        ))
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let state = test_state();
        let cluster = ClusterConfig::new(
            "prod".to_string(),
            "https://api.prod.example:6443".to_string(),
            "token".to_string(),
            vec!["default".to_string()],
        );
        state.register_cluster(cluster.clone()).await;

        let request = UpdateClusterRequest {
            name: Some("prod-eu".to_string()),
            api_url: None,
            token: None,
            namespaces: None,
            auto_scan: Some(true),
        };
        let updated = update_cluster(State(state.clone()), Path(cluster.id), Json(request))
            .await
            .expect("update")
            .0;

        assert_eq!(updated.name, "prod-eu");
        assert!(updated.auto_scan);
        // Untouched fields survive the partial update
        assert_eq!(updated.api_url, "https://api.prod.example:6443");
        assert_eq!(updated.token, "token");
        assert_eq!(updated.namespaces, vec!["default".to_string()]);

        let stored = state.get_cluster(cluster.id).await.expect("registered");
        assert_eq!(stored.name, "prod-eu");
    }

    #[tokio::test]
    async fn update_of_unknown_cluster_is_not_found() {
        let request = UpdateClusterRequest {
            name: Some("x".to_string()),
            api_url: None,
            token: None,
            namespaces: None,
            auto_scan: None,
        };
        let result = update_cluster(State(test_state()), Path(Uuid::now_v7()), Json(request)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
