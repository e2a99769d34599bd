// Object Extractor - certificate discovery across one namespace's objects
//
// Applies the classifier to every key/value entry of every listed object.
// Failure is absorbed at the smallest possible granularity: a key that fails
// to decode or parse yields nothing and never disturbs sibling keys or
// sibling objects.

use crate::classifier;
use crate::cluster::ConfigObject;
use crate::store::models::{CertificateRecord, ObjectKind};
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Identity of the scan a batch of records belongs to
#[derive(Debug, Clone)]
pub struct ScanScope {
    pub scan_id: Uuid,
    pub cluster_id: Uuid,
    pub cluster_name: String,
}

/// Extract certificate records from one namespace's objects of a single kind.
///
/// Secret values arrive base64-encoded at the object level and are decoded
/// once here before classification; ConfigMap values pass through unchanged.
/// An object commonly yields zero, one or several records (one per recognized
/// key).
pub fn extract_from_objects(
    kind: ObjectKind,
    namespace: &str,
    objects: &[ConfigObject],
    scope: &ScanScope,
    now: DateTime<Utc>,
) -> Vec<CertificateRecord> {
    let mut records = Vec::new();

    for object in objects {
        for (key, value) in &object.data {
            let raw = match kind {
                ObjectKind::Secret => {
                    match base64::engine::general_purpose::STANDARD.decode(value.as_bytes()) {
                        Ok(bytes) => bytes,
                        // Not valid base64: the entry cannot hold certificate
                        // material, skip the key
                        Err(_) => continue,
                    }
                }
                ObjectKind::ConfigMap => value.as_bytes().to_vec(),
            };

            if let Some(facts) = classifier::classify(&raw, now) {
                debug!(
                    "found certificate in {}/{} ({}) key {}",
                    namespace,
                    object.name,
                    kind.as_str(),
                    key
                );
                records.push(CertificateRecord::from_facts(
                    scope.scan_id,
                    scope.cluster_id,
                    &scope.cluster_name,
                    namespace,
                    &object.name,
                    kind,
                    key,
                    facts,
                ));
            }
        }
    }

    records
}
