// API State Management

use crate::api::config::ApiConfig;
use crate::cluster::ClusterConfig;
use crate::scanner::ScanOrchestrator;
use crate::store::ScanStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared application state
pub struct AppState {
    pub config: Arc<ApiConfig>,

    /// Persistence and query collaborator
    pub store: Arc<dyn ScanStore>,

    /// Scan lifecycle owner
    pub orchestrator: ScanOrchestrator,

    /// Registry of monitored clusters
    clusters: RwLock<HashMap<Uuid, ClusterConfig>>,
}

impl AppState {
    pub fn new(config: ApiConfig, store: Arc<dyn ScanStore>) -> Self {
        let orchestrator = ScanOrchestrator::new(Arc::clone(&store))
            .with_namespace_concurrency(config.namespace_concurrency)
            .with_namespace_timeout(Duration::from_secs(config.namespace_timeout_seconds));

        Self {
            config: Arc::new(config),
            store,
            orchestrator,
            clusters: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_cluster(&self, cluster: ClusterConfig) {
        self.clusters.write().await.insert(cluster.id, cluster);
    }

    pub async fn get_cluster(&self, id: Uuid) -> Option<ClusterConfig> {
        self.clusters.read().await.get(&id).cloned()
    }

    pub async fn remove_cluster(&self, id: Uuid) -> Option<ClusterConfig> {
        self.clusters.write().await.remove(&id)
    }

    pub async fn list_clusters(&self) -> Vec<ClusterConfig> {
        let mut clusters: Vec<ClusterConfig> = self.clusters.read().await.values().cloned().collect();
        clusters.sort_by(|a, b| a.name.cmp(&b.name));
        clusters
    }

    pub async fn cluster_count(&self) -> usize {
        self.clusters.read().await.len()
    }
}
