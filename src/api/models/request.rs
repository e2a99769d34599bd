// API Request Models

use serde::Deserialize;
use uuid::Uuid;

/// Register a cluster for monitoring
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    pub api_url: String,
    pub token: String,
    /// Namespace allow-list; empty means scan all namespaces
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub auto_scan: bool,
}

/// Partial update of a registered cluster; absent fields keep their value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub name: Option<String>,
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub namespaces: Option<Vec<String>>,
    pub auto_scan: Option<bool>,
}

/// Initiate a scan
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub cluster_id: Uuid,
}

/// Bulk certificate export request; only the JSON format is supported
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub format: String,
    #[serde(default)]
    pub filters: ExportFilters,
}

/// Export filters mirror the results listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportFilters {
    pub status: Option<String>,
    pub cluster: Option<String>,
    pub search: Option<String>,
}

/// Query parameters for the certificate results listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateResultsParams {
    /// OK | WARNING | EXPIRED, or "all"
    pub status: Option<String>,
    /// Cluster name, or "all"
    pub cluster: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Query parameters for the recent-scans listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentScansParams {
    pub limit: Option<usize>,
}
