// Cluster Module - monitored cluster records and resource access

pub mod client;

pub use client::{ClusterClient, ConfigObject, KubeApiClient};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored cluster: API endpoint, credentials and scan scope.
///
/// `namespaces` is the configured allow-list; when empty the scan resolves the
/// full namespace listing dynamically at run time. The two paths are distinct:
/// a static allow-list is used as-is, never re-checked against the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub id: Uuid,
    pub name: String,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub token: String,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub auto_scan: bool,
}

impl ClusterConfig {
    pub fn new(name: String, api_url: String, token: String, namespaces: Vec<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            api_url,
            token,
            namespaces,
            auto_scan: false,
        }
    }
}
