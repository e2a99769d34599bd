// API Configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite database URL; in-memory store when absent
    pub database_url: Option<String>,

    /// Bound on concurrently scanned namespaces within one scan
    pub namespace_concurrency: usize,

    /// Per-namespace processing bound in seconds
    pub namespace_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            namespace_concurrency: crate::scanner::DEFAULT_NAMESPACE_CONCURRENCY,
            namespace_timeout_seconds: crate::scanner::DEFAULT_NAMESPACE_TIMEOUT.as_secs(),
        }
    }
}

impl ApiConfig {
    /// Load config from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
