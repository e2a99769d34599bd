// Cluster resource-access client
//
// Capability interface over the cluster API plus the production implementation
// speaking Kubernetes core/v1 REST. The client holds credentials and a
// connection configuration, is read-only for the duration of a scan, and is
// shared across concurrent namespace fetches.

use crate::cluster::ClusterConfig;
use crate::error::ScanError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// One configuration object (Secret or ConfigMap) as listed from the cluster.
///
/// Secret values are base64-encoded at the object level, exactly as the API
/// returns them; decoding happens in the extractor. ConfigMap values are plain
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigObject {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

/// Resource-access capability consumed by the scan orchestrator
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Cheap reachability probe, run before any scan work
    async fn test_connectivity(&self) -> Result<(), ScanError>;

    /// All namespace names visible to the credentials
    async fn list_namespaces(&self) -> Result<Vec<String>, ScanError>;

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError>;

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError>;
}

// Wire shapes for core/v1 list responses; everything not needed is ignored.
#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<ApiObject>,
}

#[derive(Debug, Deserialize)]
struct ApiObject {
    metadata: ObjectMeta,
    #[serde(default)]
    data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

/// Kubernetes API client using bearer-token authentication.
///
/// TLS verification is disabled: monitored clusters routinely present
/// certificates signed by their own internal CA.
pub struct KubeApiClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl KubeApiClient {
    pub fn new(cluster: &ClusterConfig) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScanError::ClusterUnreachable(e.to_string()))?;

        Ok(Self {
            base_url: cluster.api_url.trim_end_matches('/').to_string(),
            token: cluster.token.clone(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{} returned HTTP {}", path, status));
        }

        response.json::<T>().await.map_err(|e| e.to_string())
    }

    fn into_objects(list: ObjectList) -> Vec<ConfigObject> {
        list.items
            .into_iter()
            .map(|item| ConfigObject {
                name: item.metadata.name,
                data: item.data.unwrap_or_default(),
            })
            .collect()
    }
}

#[async_trait]
impl ClusterClient for KubeApiClient {
    async fn test_connectivity(&self) -> Result<(), ScanError> {
        self.get_json::<ObjectList>("/api/v1/namespaces")
            .await
            .map(|_| ())
            .map_err(ScanError::ClusterUnreachable)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ScanError> {
        let list: ObjectList = self
            .get_json("/api/v1/namespaces")
            .await
            .map_err(ScanError::ClusterUnreachable)?;
        Ok(list.items.into_iter().map(|ns| ns.metadata.name).collect())
    }

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError> {
        let list: ObjectList = self
            .get_json(&format!("/api/v1/namespaces/{namespace}/secrets"))
            .await
            .map_err(|reason| ScanError::NamespaceAccess {
                namespace: namespace.to_string(),
                resource: "secrets".to_string(),
                reason,
            })?;
        Ok(Self::into_objects(list))
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError> {
        let list: ObjectList = self
            .get_json(&format!("/api/v1/namespaces/{namespace}/configmaps"))
            .await
            .map_err(|reason| ScanError::NamespaceAccess {
                namespace: namespace.to_string(),
                resource: "configmaps".to_string(),
                reason,
            })?;
        Ok(Self::into_objects(list))
    }
}
