// API Response Models

use crate::classifier::CertStatus;
use crate::cluster::ClusterConfig;
use crate::store::models::{CertificateRecord, ObjectKind, ScanRun, ScanState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Scan accepted; the outcome is observable later via the scan run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInitiatedResponse {
    pub scan_id: Uuid,
    pub state: ScanState,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentScansResponse {
    pub scans: Vec<ScanRun>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResultsResponse {
    pub certificates: Vec<CertificateRecord>,
}

/// Dashboard totals over the latest completed scan per cluster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub valid: u64,
    pub warning: u64,
    pub expired: u64,
    pub clusters: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    pub clusters: Vec<ClusterConfig>,
}

/// Outcome of a cluster connection test
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub message: String,
    pub namespaces: Vec<String>,
}

// Export bodies use snake_case: exported files are consumed by external
// tooling that expects this shape.

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExportSummary {
    pub total_certificates: usize,
    pub ok_count: usize,
    pub warning_count: usize,
    pub expired_count: usize,
}

impl ExportSummary {
    pub fn of(certificates: &[ExportedCertificate]) -> Self {
        let mut summary = ExportSummary {
            total_certificates: certificates.len(),
            ..Default::default()
        };
        for certificate in certificates {
            match certificate.status {
                CertStatus::Ok => summary.ok_count += 1,
                CertStatus::Warning => summary.warning_count += 1,
                CertStatus::Expired => summary.expired_count += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedCertificate {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub namespace: String,
    pub object_name: String,
    pub object_kind: ObjectKind,
    pub certificate_key: String,
    pub status: CertStatus,
    pub not_valid_before: DateTime<Utc>,
    pub not_valid_after: DateTime<Utc>,
    pub days_remaining: i64,
    pub issuer: String,
    pub subject: String,
}

impl From<CertificateRecord> for ExportedCertificate {
    fn from(record: CertificateRecord) -> Self {
        Self {
            id: record.id,
            scan_id: record.scan_id,
            cluster_id: record.cluster_id,
            cluster_name: record.cluster_name,
            namespace: record.namespace,
            object_name: record.object_name,
            object_kind: record.object_kind,
            certificate_key: record.certificate_key,
            status: record.status,
            not_valid_before: record.not_valid_before,
            not_valid_after: record.not_valid_after,
            days_remaining: record.days_remaining,
            issuer: record.issuer,
            subject: record.subject,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub export_timestamp: DateTime<Utc>,
    pub export_type: &'static str,
    pub summary: ExportSummary,
    pub certificates: Vec<ExportedCertificate>,
}
