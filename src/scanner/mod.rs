// Scan Orchestrator - owns the scan lifecycle
//
// initiate_scan persists an in-progress run and returns it immediately; the
// scan body executes on a spawned task (fire-and-forget). Cluster-level
// failures are captured into the run itself since no synchronous caller is
// left to receive them.

use crate::cluster::{ClusterClient, ClusterConfig};
use crate::error::ScanError;
use crate::extractor::{self, ScanScope};
use crate::store::models::{CertificateRecord, ObjectKind, ScanRun, ScanSummary};
use crate::store::ScanStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Default bound on concurrently scanned namespaces within one scan
pub const DEFAULT_NAMESPACE_CONCURRENCY: usize = 8;

/// Default bound on one namespace's secret + config-map processing, so a
/// single unreachable namespace cannot stall the whole scan
pub const DEFAULT_NAMESPACE_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives certificate scans across clusters. Cheap to clone; scans for
/// different clusters share nothing but the store.
#[derive(Clone)]
pub struct ScanOrchestrator {
    store: Arc<dyn ScanStore>,
    namespace_concurrency: usize,
    namespace_timeout: Duration,
}

impl ScanOrchestrator {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self {
            store,
            namespace_concurrency: DEFAULT_NAMESPACE_CONCURRENCY,
            namespace_timeout: DEFAULT_NAMESPACE_TIMEOUT,
        }
    }

    pub fn with_namespace_concurrency(mut self, concurrency: usize) -> Self {
        self.namespace_concurrency = concurrency.max(1);
        self
    }

    pub fn with_namespace_timeout(mut self, timeout: Duration) -> Self {
        self.namespace_timeout = timeout;
        self
    }

    /// Create a scan run for the cluster and kick off the scan body in the
    /// background. The returned run is in state `InProgress`; the caller
    /// observes only that the scan has been accepted, not its outcome.
    pub async fn initiate_scan(
        &self,
        cluster: &ClusterConfig,
        client: Arc<dyn ClusterClient>,
    ) -> Result<ScanRun, ScanError> {
        info!(
            "initiating certificate scan for cluster {} ({})",
            cluster.name, cluster.id
        );

        let run = ScanRun::new(cluster);
        self.store.create_scan_run(&run).await?;
        info!("created scan run {}", run.id);

        let orchestrator = self.clone();
        let cluster = cluster.clone();
        let background_run = run.clone();
        tokio::spawn(async move {
            orchestrator.perform_scan(background_run, cluster, client).await;
        });

        Ok(run)
    }

    /// The scan body. Never returns an error: every outcome, including
    /// persistence failure, ends in a finalized run.
    async fn perform_scan(
        &self,
        mut run: ScanRun,
        cluster: ClusterConfig,
        client: Arc<dyn ClusterClient>,
    ) {
        info!("starting scan {} for cluster {}", run.id, cluster.name);

        if let Err(e) = client.test_connectivity().await {
            self.fail_run(&mut run, e.to_string()).await;
            return;
        }

        // Configured allow-list when non-empty, otherwise the dynamic listing.
        // The two paths stay distinct: an allow-list is taken as-is.
        let namespaces = if !cluster.namespaces.is_empty() {
            cluster.namespaces.clone()
        } else {
            match client.list_namespaces().await {
                Ok(namespaces) => namespaces,
                Err(e) => {
                    self.fail_run(&mut run, e.to_string()).await;
                    return;
                }
            }
        };
        info!("scan {}: scanning {} namespaces", run.id, namespaces.len());

        // One evaluation instant per scan keeps the run's records mutually
        // consistent.
        let evaluated_at = Utc::now();
        let scope = ScanScope {
            scan_id: run.id,
            cluster_id: run.cluster_id,
            cluster_name: run.cluster_name.clone(),
        };

        let semaphore = Arc::new(Semaphore::new(self.namespace_concurrency));
        let mut tasks: JoinSet<Result<(String, Vec<CertificateRecord>), ScanError>> =
            JoinSet::new();

        for namespace in namespaces {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&client);
            let scope = scope.clone();
            let timeout = self.namespace_timeout;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ScanError::Persistence(e.to_string()))?;

                match tokio::time::timeout(
                    timeout,
                    scan_namespace(client.as_ref(), &namespace, &scope, evaluated_at),
                )
                .await
                {
                    Ok(Ok(records)) => Ok((namespace, records)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ScanError::NamespaceTimeout { namespace, timeout }),
                }
            });
        }

        let mut records: Vec<CertificateRecord> = Vec::new();
        let mut scanned_namespaces: Vec<String> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((namespace, namespace_records))) => {
                    records.extend(namespace_records);
                    scanned_namespaces.push(namespace);
                }
                // Per-namespace failures are absorbed: one unreachable or
                // forbidden namespace must not hide results from the rest
                Ok(Err(e)) => warn!("scan {}: skipping namespace: {}", run.id, e),
                Err(e) => warn!("scan {}: namespace task panicked: {}", run.id, e),
            }
        }
        scanned_namespaces.sort();

        // Insert records before finalizing so a run is never observable as
        // Completed without its records.
        if !records.is_empty() {
            if let Err(e) = self.store.bulk_insert_certificates(&records).await {
                self.fail_run(&mut run, e.to_string()).await;
                return;
            }
            info!("scan {}: saved {} certificates", run.id, records.len());
        }

        let summary = ScanSummary::of(&records);
        run.mark_completed(summary, scanned_namespaces);
        match self.store.finalize_scan_run(&run).await {
            Ok(()) => info!(
                "completed scan {}: found {} certificates (valid {}, warning {}, expired {})",
                run.id, run.certificates_found, summary.valid, summary.warning, summary.expired
            ),
            Err(e) => error!("scan {}: failed to finalize: {}", run.id, e),
        }
    }

    async fn fail_run(&self, run: &mut ScanRun, reason: String) {
        error!("scan {} failed: {}", run.id, reason);
        run.mark_failed(reason);
        if let Err(e) = self.store.finalize_scan_run(run).await {
            error!("scan {}: failed to record failure: {}", run.id, e);
        }
    }
}

/// Process one namespace: list secrets and config maps, extract certificates
/// from both. Any listing error fails the namespace as a unit.
async fn scan_namespace(
    client: &dyn ClusterClient,
    namespace: &str,
    scope: &ScanScope,
    evaluated_at: DateTime<Utc>,
) -> Result<Vec<CertificateRecord>, ScanError> {
    let mut records = Vec::new();

    let secrets = client.list_secrets(namespace).await?;
    records.extend(extractor::extract_from_objects(
        ObjectKind::Secret,
        namespace,
        &secrets,
        scope,
        evaluated_at,
    ));

    let config_maps = client.list_config_maps(namespace).await?;
    records.extend(extractor::extract_from_objects(
        ObjectKind::ConfigMap,
        namespace,
        &config_maps,
        scope,
        evaluated_at,
    ));

    Ok(records)
}
