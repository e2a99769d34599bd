// Store Module - persistence and query contracts for scans and certificates

pub mod memory;
pub mod models;
pub mod resolver;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::{
    CertificateFilter, CertificateRecord, ObjectKind, ScanRun, ScanState, ScanStatistics,
    ScanSummary,
};
pub use sqlite::SqliteStore;

use crate::error::ScanError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence and query collaborator for the scan engine.
///
/// The write path guarantees write-before-visible: the orchestrator inserts a
/// run's certificate records before finalizing the run, so a run is never
/// observable as `Completed` without its records. Implementations must reject
/// finalization of an already-terminal run (immutable history).
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Persist a freshly created in-progress run
    async fn create_scan_run(&self, run: &ScanRun) -> Result<(), ScanError>;

    /// Persist a run's single terminal transition (`Completed` or `Failed`)
    async fn finalize_scan_run(&self, run: &ScanRun) -> Result<(), ScanError>;

    /// Persist all certificate records of one scan pass
    async fn bulk_insert_certificates(&self, records: &[CertificateRecord])
        -> Result<(), ScanError>;

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>, ScanError>;

    /// Most recently started runs, any state, newest first
    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>, ScanError>;

    /// Run counts by state plus the last-24-hours count, across all clusters
    async fn scan_statistics(&self) -> Result<ScanStatistics, ScanError>;

    /// Latest completed run per cluster. An empty `cluster_ids` slice means
    /// all clusters.
    async fn find_completed_scans(&self, cluster_ids: &[Uuid]) -> Result<Vec<ScanRun>, ScanError>;

    /// Certificate records scoped to the given scan ids. Callers obtain the
    /// ids from `find_completed_scans`; querying outside that scope mixes in
    /// superseded or failed runs.
    async fn query_certificates(
        &self,
        scan_ids: &[Uuid],
        filter: &CertificateFilter,
    ) -> Result<Vec<CertificateRecord>, ScanError>;
}
