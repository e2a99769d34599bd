// Scan and certificate record models
//
// ScanRun is exclusively owned by the orchestrator while in flight and mutated
// exactly once at completion; records are immutable history, superseded (never
// deleted) by later scans and excluded logically by the resolver.

use crate::classifier::{CertStatus, CertificateFacts};
use crate::cluster::ClusterConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan lifecycle state: `InProgress` at creation, exactly one transition to a
/// terminal state, never resumed or retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    InProgress,
    Completed,
    Failed,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::InProgress => "in_progress",
            ScanState::Completed => "completed",
            ScanState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Failed)
    }
}

impl std::str::FromStr for ScanState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ScanState::InProgress),
            "completed" => Ok(ScanState::Completed),
            "failed" => Ok(ScanState::Failed),
            other => Err(format!("unknown scan state: {other}")),
        }
    }
}

/// Certificate counts by classification for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub valid: u64,
    pub warning: u64,
    pub expired: u64,
}

impl ScanSummary {
    /// Count records by status
    pub fn of(records: &[CertificateRecord]) -> Self {
        let mut summary = ScanSummary::default();
        for record in records {
            match record.status {
                CertStatus::Ok => summary.valid += 1,
                CertStatus::Warning => summary.warning += 1,
                CertStatus::Expired => summary.expired += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> u64 {
        self.valid + self.warning + self.expired
    }
}

/// One end-to-end scan of a cluster's targeted namespaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRun {
    /// Time-ordered (UUIDv7) id; the resolver tie-break relies on ids
    /// increasing with creation time
    pub id: Uuid,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub state: ScanState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificates_found: u64,
    pub summary: ScanSummary,
    /// Namespaces that were actually scanned, resolved at run time
    pub namespaces: Vec<String>,
    /// Human-readable failure detail, set only when state is `Failed`
    pub error: Option<String>,
}

impl ScanRun {
    /// Create a new in-progress run for a cluster
    pub fn new(cluster: &ClusterConfig) -> Self {
        Self {
            id: Uuid::now_v7(),
            cluster_id: cluster.id,
            cluster_name: cluster.name.clone(),
            state: ScanState::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            certificates_found: 0,
            summary: ScanSummary::default(),
            namespaces: Vec::new(),
            error: None,
        }
    }

    /// Terminal transition to `Completed` with the aggregated results
    pub fn mark_completed(&mut self, summary: ScanSummary, namespaces: Vec<String>) {
        self.state = ScanState::Completed;
        self.completed_at = Some(Utc::now());
        self.certificates_found = summary.total();
        self.summary = summary;
        self.namespaces = namespaces;
    }

    /// Terminal transition to `Failed` with the triggering error
    pub fn mark_failed(&mut self, error: String) {
        self.state = ScanState::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
    }
}

/// Aggregate run counts over the whole scan history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_scans: u64,
    pub completed_scans: u64,
    pub failed_scans: u64,
    pub in_progress_scans: u64,
    pub scans_last_24h: u64,
}

/// Kind of configuration object a certificate was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Secret,
    ConfigMap,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Secret => "Secret",
            ObjectKind::ConfigMap => "ConfigMap",
        }
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Secret" => Ok(ObjectKind::Secret),
            "ConfigMap" => Ok(ObjectKind::ConfigMap),
            other => Err(format!("unknown object kind: {other}")),
        }
    }
}

/// One certificate discovered during a scan, with its location and the
/// classifier's facts denormalized for querying
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub cluster_id: Uuid,
    pub cluster_name: String,
    pub namespace: String,
    pub object_name: String,
    pub object_kind: ObjectKind,
    /// The key within the object's data map that held the encoded material
    pub certificate_key: String,
    pub status: CertStatus,
    pub not_valid_before: DateTime<Utc>,
    pub not_valid_after: DateTime<Utc>,
    pub days_remaining: i64,
    pub issuer: String,
    pub subject: String,
}

impl CertificateRecord {
    /// Build a record from a classification hit at a known location
    #[allow(clippy::too_many_arguments)]
    pub fn from_facts(
        scan_id: Uuid,
        cluster_id: Uuid,
        cluster_name: &str,
        namespace: &str,
        object_name: &str,
        object_kind: ObjectKind,
        certificate_key: &str,
        facts: CertificateFacts,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            scan_id,
            cluster_id,
            cluster_name: cluster_name.to_string(),
            namespace: namespace.to_string(),
            object_name: object_name.to_string(),
            object_kind,
            certificate_key: certificate_key.to_string(),
            status: facts.status,
            not_valid_before: facts.not_valid_before,
            not_valid_after: facts.not_valid_after,
            days_remaining: facts.days_remaining,
            issuer: facts.issuer,
            subject: facts.subject,
        }
    }
}

/// Filters for certificate result queries. All fields are conjunctive;
/// `search` matches object name, namespace or cluster name case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    pub status: Option<CertStatus>,
    pub cluster_name: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}
