// Error types for certwatch
//
// Structured error types using thiserror. "Not a certificate" is deliberately
// absent: the classifier reports it as a normal negative result, never an error.

use std::time::Duration;
use thiserror::Error;

/// Main error type for scan operations.
///
/// The variants encode the propagation policy: `NamespaceAccess` and
/// `NamespaceTimeout` are absorbed by the orchestrator (logged, namespace
/// skipped), while `ClusterUnreachable` and `Persistence` fail the whole run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Connectivity check or namespace enumeration failed; fatal to the scan
    #[error("cluster unreachable: {0}")]
    ClusterUnreachable(String),

    /// Listing secrets or config maps in one namespace failed; that
    /// namespace's contribution is empty and the scan continues
    #[error("failed to list {resource} in namespace {namespace}: {reason}")]
    NamespaceAccess {
        namespace: String,
        resource: String,
        reason: String,
    },

    /// A namespace took longer than the configured bound; treated like a
    /// namespace access failure
    #[error("namespace {namespace} timed out after {timeout:?}")]
    NamespaceTimeout {
        namespace: String,
        timeout: Duration,
    },

    /// Store operation failed; a scan must not be left `Completed` when its
    /// records did not persist
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ScanError {
    /// Whether this error fails the whole scan, as opposed to being absorbed
    /// at namespace granularity.
    pub fn is_scan_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::ClusterUnreachable(_) | ScanError::Persistence(_)
        )
    }
}
