// End-to-end scan flow against an in-memory store and a mock cluster.
//
// Scans are fire-and-forget, so every test polls the store until the run
// reaches a terminal state before asserting on the outcome.

use async_trait::async_trait;
use base64::Engine;
use certwatch::classifier::CertStatus;
use certwatch::cluster::{ClusterClient, ClusterConfig, ConfigObject};
use certwatch::error::ScanError;
use certwatch::scanner::ScanOrchestrator;
use certwatch::store::models::CertificateFilter;
use certwatch::store::{MemoryStore, ScanRun, ScanState, ScanStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn test_cert_pem(cn: &str, days_valid: i64) -> String {
    use rcgen::{CertificateParams, DnType, KeyPair};

    let now = time::OffsetDateTime::now_utc();
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.not_before = now - time::Duration::days(1);
    params.not_after = now + time::Duration::days(days_valid);

    let key_pair = KeyPair::generate().expect("key generation should succeed");
    params
        .self_signed(&key_pair)
        .expect("self-signing should succeed")
        .pem()
}

fn b64(data: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(data.as_bytes())
}

fn secret(name: &str, key: &str, pem: &str) -> ConfigObject {
    let mut data = BTreeMap::new();
    data.insert(key.to_string(), b64(pem));
    ConfigObject {
        name: name.to_string(),
        data,
    }
}

fn test_cluster() -> ClusterConfig {
    ClusterConfig::new(
        "test-cluster".to_string(),
        "https://api.test.example:6443".to_string(),
        "token".to_string(),
        vec![],
    )
}

/// Mock cluster serving canned namespace contents, with optional failures.
#[derive(Default)]
struct MockClient {
    reachable: bool,
    secrets: HashMap<String, Vec<ConfigObject>>,
    config_maps: HashMap<String, Vec<ConfigObject>>,
    failing_namespaces: HashSet<String>,
    stalled_namespaces: HashSet<String>,
}

impl MockClient {
    fn new() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    fn unreachable() -> Self {
        Self::default()
    }

    fn with_secrets(mut self, namespace: &str, objects: Vec<ConfigObject>) -> Self {
        self.secrets.insert(namespace.to_string(), objects);
        self
    }

    fn with_config_maps(mut self, namespace: &str, objects: Vec<ConfigObject>) -> Self {
        self.config_maps.insert(namespace.to_string(), objects);
        self
    }

    fn with_failing_namespace(mut self, namespace: &str) -> Self {
        self.failing_namespaces.insert(namespace.to_string());
        // Listed, but every resource fetch for it fails
        self.secrets.entry(namespace.to_string()).or_default();
        self
    }

    fn with_stalled_namespace(mut self, namespace: &str) -> Self {
        self.stalled_namespaces.insert(namespace.to_string());
        // Listed, but every resource fetch for it hangs
        self.secrets.entry(namespace.to_string()).or_default();
        self
    }
}

#[async_trait]
impl ClusterClient for MockClient {
    async fn test_connectivity(&self) -> Result<(), ScanError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ScanError::ClusterUnreachable(
                "connection refused".to_string(),
            ))
        }
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ScanError> {
        let mut namespaces: Vec<String> = self
            .secrets
            .keys()
            .chain(self.config_maps.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        namespaces.sort();
        Ok(namespaces)
    }

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError> {
        if self.stalled_namespaces.contains(namespace) {
            tokio::time::sleep(Duration::from_secs(300)).await;
        }
        if self.failing_namespaces.contains(namespace) {
            return Err(ScanError::NamespaceAccess {
                namespace: namespace.to_string(),
                resource: "secrets".to_string(),
                reason: "secrets is forbidden".to_string(),
            });
        }
        Ok(self.secrets.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigObject>, ScanError> {
        if self.failing_namespaces.contains(namespace) {
            return Err(ScanError::NamespaceAccess {
                namespace: namespace.to_string(),
                resource: "configmaps".to_string(),
                reason: "configmaps is forbidden".to_string(),
            });
        }
        Ok(self.config_maps.get(namespace).cloned().unwrap_or_default())
    }
}

/// Poll until the run leaves `InProgress`, failing the test if it never does.
async fn wait_for_terminal(store: &MemoryStore, scan_id: Uuid) -> ScanRun {
    for _ in 0..500 {
        let run = store
            .get_scan_run(scan_id)
            .await
            .expect("store lookup should succeed")
            .expect("run should exist");
        if run.state.is_terminal() {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan {scan_id} did not reach a terminal state");
}

#[tokio::test]
async fn scan_completes_and_isolates_failing_namespace() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());

    let client = MockClient::new()
        .with_secrets(
            "app-a",
            vec![secret("tls-a", "tls.crt", &test_cert_pem("a.example", 90))],
        )
        .with_failing_namespace("app-b")
        .with_secrets(
            "app-c",
            vec![secret("tls-c", "tls.crt", &test_cert_pem("c.example", 120))],
        );

    let cluster = test_cluster();
    let run = orchestrator
        .initiate_scan(&cluster, Arc::new(client))
        .await
        .expect("scan should start");
    assert_eq!(run.state, ScanState::InProgress);

    let finished = wait_for_terminal(&store, run.id).await;
    assert_eq!(finished.state, ScanState::Completed);
    assert_eq!(finished.certificates_found, 2);
    assert_eq!(finished.summary.valid, 2);
    assert_eq!(finished.summary.warning, 0);
    assert_eq!(finished.summary.expired, 0);
    // The failing namespace is skipped, not recorded as scanned
    assert_eq!(finished.namespaces, vec!["app-a", "app-c"]);
    assert!(finished.error.is_none());
}

#[tokio::test]
async fn stalled_namespace_times_out_and_is_excluded() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator =
        ScanOrchestrator::new(store.clone()).with_namespace_timeout(Duration::from_millis(50));

    let client = MockClient::new()
        .with_secrets(
            "responsive",
            vec![secret("tls", "tls.crt", &test_cert_pem("r.example", 90))],
        )
        .with_stalled_namespace("hung");

    let run = orchestrator
        .initiate_scan(&test_cluster(), Arc::new(client))
        .await
        .expect("scan should start");

    // The hung namespace is bounded by the timeout and dropped like any other
    // per-namespace failure; the scan itself still completes.
    let finished = wait_for_terminal(&store, run.id).await;
    assert_eq!(finished.state, ScanState::Completed);
    assert_eq!(finished.namespaces, vec!["responsive"]);
    assert_eq!(finished.certificates_found, 1);
    assert!(finished.error.is_none());
}

#[tokio::test]
async fn unreachable_cluster_fails_the_run_without_records() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());

    let run = orchestrator
        .initiate_scan(&test_cluster(), Arc::new(MockClient::unreachable()))
        .await
        .expect("scan should start");

    let finished = wait_for_terminal(&store, run.id).await;
    assert_eq!(finished.state, ScanState::Failed);
    assert!(finished
        .error
        .as_deref()
        .is_some_and(|e| e.contains("connection refused")));
    assert_eq!(finished.certificates_found, 0);

    let records = store
        .query_certificates(&[run.id], &CertificateFilter::default())
        .await
        .expect("query should succeed");
    assert!(records.is_empty());
}

#[tokio::test]
async fn summary_matches_stored_records() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());

    let mut expiring = BTreeMap::new();
    expiring.insert("tls.crt".to_string(), test_cert_pem("soon.example", 10));
    let client = MockClient::new()
        .with_secrets(
            "ingress",
            vec![
                secret("tls-ok", "tls.crt", &test_cert_pem("ok.example", 90)),
                secret("tls-soon", "tls.crt", &test_cert_pem("soon.example", 10)),
            ],
        )
        .with_config_maps(
            "ingress",
            vec![ConfigObject {
                name: "ca-bundle".to_string(),
                data: expiring,
            }],
        );

    let run = orchestrator
        .initiate_scan(&test_cluster(), Arc::new(client))
        .await
        .expect("scan should start");
    let finished = wait_for_terminal(&store, run.id).await;

    assert_eq!(finished.state, ScanState::Completed);
    assert_eq!(finished.summary.valid, 1);
    assert_eq!(finished.summary.warning, 2);
    assert_eq!(
        finished.summary.total(),
        finished.certificates_found,
        "summary counts must add up to the certificate total"
    );

    let records = store
        .query_certificates(&[run.id], &CertificateFilter::default())
        .await
        .expect("query should succeed");
    assert_eq!(records.len() as u64, finished.certificates_found);
    assert_eq!(
        records
            .iter()
            .filter(|r| r.status == CertStatus::Warning)
            .count(),
        2
    );
}

#[tokio::test]
async fn later_completed_scan_supersedes_earlier_one() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());
    let cluster = test_cluster();

    let first_client = MockClient::new().with_secrets(
        "default",
        vec![secret("tls-old", "tls.crt", &test_cert_pem("old.example", 90))],
    );
    let first = orchestrator
        .initiate_scan(&cluster, Arc::new(first_client))
        .await
        .expect("scan should start");
    wait_for_terminal(&store, first.id).await;

    let second_client = MockClient::new().with_secrets(
        "default",
        vec![
            secret("tls-new", "tls.crt", &test_cert_pem("new.example", 90)),
            secret("tls-extra", "tls.crt", &test_cert_pem("extra.example", 5)),
        ],
    );
    let second = orchestrator
        .initiate_scan(&cluster, Arc::new(second_client))
        .await
        .expect("scan should start");
    wait_for_terminal(&store, second.id).await;

    // Only the newer completed run represents the cluster
    let latest = store
        .find_completed_scans(&[cluster.id])
        .await
        .expect("resolver query should succeed");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, second.id);
    assert_eq!(latest[0].certificates_found, 2);

    // Records of the superseded run remain stored but out of resolver scope
    let scan_ids: Vec<Uuid> = latest.iter().map(|run| run.id).collect();
    let visible = store
        .query_certificates(&scan_ids, &CertificateFilter::default())
        .await
        .expect("query should succeed");
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|r| r.scan_id == second.id));

    let superseded = store
        .query_certificates(&[first.id], &CertificateFilter::default())
        .await
        .expect("query should succeed");
    assert_eq!(superseded.len(), 1);
    assert_eq!(superseded[0].object_name, "tls-old");
}

#[tokio::test]
async fn failed_scan_never_becomes_the_latest_result() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());
    let cluster = test_cluster();

    let good_client = MockClient::new().with_secrets(
        "default",
        vec![secret("tls", "tls.crt", &test_cert_pem("good.example", 90))],
    );
    let good = orchestrator
        .initiate_scan(&cluster, Arc::new(good_client))
        .await
        .expect("scan should start");
    wait_for_terminal(&store, good.id).await;

    let bad = orchestrator
        .initiate_scan(&cluster, Arc::new(MockClient::unreachable()))
        .await
        .expect("scan should start");
    wait_for_terminal(&store, bad.id).await;

    let latest = store
        .find_completed_scans(&[cluster.id])
        .await
        .expect("resolver query should succeed");
    assert_eq!(latest.len(), 1);
    assert_eq!(
        latest[0].id, good.id,
        "a newer failed run must not displace the last completed one"
    );
}

#[tokio::test]
async fn configured_namespace_allow_list_is_taken_as_is() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = ScanOrchestrator::new(store.clone());

    let client = MockClient::new()
        .with_secrets(
            "watched",
            vec![secret("tls", "tls.crt", &test_cert_pem("w.example", 90))],
        )
        .with_secrets(
            "ignored",
            vec![secret("tls", "tls.crt", &test_cert_pem("i.example", 90))],
        );

    let mut cluster = test_cluster();
    cluster.namespaces = vec!["watched".to_string()];

    let run = orchestrator
        .initiate_scan(&cluster, Arc::new(client))
        .await
        .expect("scan should start");
    let finished = wait_for_terminal(&store, run.id).await;

    assert_eq!(finished.state, ScanState::Completed);
    assert_eq!(finished.namespaces, vec!["watched"]);
    assert_eq!(finished.certificates_found, 1);
}
