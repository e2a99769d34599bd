// In-memory store - default store and the substrate for tests

use crate::error::ScanError;
use crate::store::models::{
    CertificateFilter, CertificateRecord, ScanRun, ScanState, ScanStatistics,
};
use crate::store::{resolver, ScanStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryInner {
    runs: HashMap<Uuid, ScanRun>,
    certificates: Vec<CertificateRecord>,
}

/// In-memory `ScanStore` implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn create_scan_run(&self, run: &ScanRun) -> Result<(), ScanError> {
        let mut inner = self.inner.write().await;
        if inner.runs.contains_key(&run.id) {
            return Err(ScanError::Persistence(format!(
                "scan run {} already exists",
                run.id
            )));
        }
        inner.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn finalize_scan_run(&self, run: &ScanRun) -> Result<(), ScanError> {
        if !run.state.is_terminal() {
            return Err(ScanError::Persistence(format!(
                "refusing to finalize scan run {} in non-terminal state {}",
                run.id,
                run.state.as_str()
            )));
        }

        let mut inner = self.inner.write().await;
        match inner.runs.get(&run.id) {
            None => Err(ScanError::Persistence(format!(
                "scan run {} not found",
                run.id
            ))),
            Some(existing) if existing.state.is_terminal() => Err(ScanError::Persistence(format!(
                "scan run {} is already finalized",
                run.id
            ))),
            Some(_) => {
                inner.runs.insert(run.id, run.clone());
                Ok(())
            }
        }
    }

    async fn bulk_insert_certificates(
        &self,
        records: &[CertificateRecord],
    ) -> Result<(), ScanError> {
        let mut inner = self.inner.write().await;
        inner.certificates.extend_from_slice(records);
        Ok(())
    }

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>, ScanError> {
        let inner = self.inner.read().await;
        Ok(inner.runs.get(&id).cloned())
    }

    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>, ScanError> {
        let inner = self.inner.read().await;
        let mut runs: Vec<ScanRun> = inner.runs.values().cloned().collect();
        runs.sort_by(|a, b| (b.started_at, b.id).cmp(&(a.started_at, a.id)));
        runs.truncate(limit);
        Ok(runs)
    }

    async fn scan_statistics(&self) -> Result<ScanStatistics, ScanError> {
        let inner = self.inner.read().await;
        let cutoff = Utc::now() - chrono::Duration::hours(24);

        let mut stats = ScanStatistics::default();
        for run in inner.runs.values() {
            stats.total_scans += 1;
            match run.state {
                ScanState::Completed => stats.completed_scans += 1,
                ScanState::Failed => stats.failed_scans += 1,
                ScanState::InProgress => stats.in_progress_scans += 1,
            }
            if run.started_at >= cutoff {
                stats.scans_last_24h += 1;
            }
        }
        Ok(stats)
    }

    async fn find_completed_scans(&self, cluster_ids: &[Uuid]) -> Result<Vec<ScanRun>, ScanError> {
        let inner = self.inner.read().await;
        let candidates = inner
            .runs
            .values()
            .filter(|run| cluster_ids.is_empty() || cluster_ids.contains(&run.cluster_id));
        Ok(resolver::latest_completed(candidates)
            .into_values()
            .cloned()
            .collect())
    }

    async fn query_certificates(
        &self,
        scan_ids: &[Uuid],
        filter: &CertificateFilter,
    ) -> Result<Vec<CertificateRecord>, ScanError> {
        let inner = self.inner.read().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut records: Vec<CertificateRecord> = inner
            .certificates
            .iter()
            .filter(|record| scan_ids.contains(&record.scan_id))
            .filter(|record| filter.status.map_or(true, |s| record.status == s))
            .filter(|record| {
                filter
                    .cluster_name
                    .as_ref()
                    .map_or(true, |name| &record.cluster_name == name)
            })
            .filter(|record| {
                search.as_ref().map_or(true, |needle| {
                    record.object_name.to_lowercase().contains(needle)
                        || record.namespace.to_lowercase().contains(needle)
                        || record.cluster_name.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect();

        // Soonest-expiring first
        records.sort_by_key(|record| record.not_valid_after);
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
