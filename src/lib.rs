// certwatch - Certificate expiry scanner for Kubernetes Secrets and ConfigMaps

//! certwatch discovers X.509 certificates embedded in the key/value data of
//! cluster-hosted Secrets and ConfigMaps, classifies each certificate's expiry
//! state, and makes the latest completed scan per cluster queryable.

pub mod api;
pub mod classifier;
pub mod cli;
pub mod cluster;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use crate::classifier::{CertStatus, CertificateFacts};
pub use crate::cli::Args;
pub use crate::error::ScanError;
pub use crate::scanner::ScanOrchestrator;

/// Result type for certwatch operations
pub type Result<T> = anyhow::Result<T>;
