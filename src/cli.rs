// Command-line arguments

use crate::api::ApiConfig;
use clap::Parser;
use std::path::PathBuf;

/// Certificate expiry scanner for Kubernetes Secrets and ConfigMaps
#[derive(Debug, Clone, Parser)]
#[command(name = "certwatch", version, about)]
pub struct Args {
    /// Host address to bind the API server to [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the API server to [default: 8080]
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database URL (e.g. sqlite://certwatch.db?mode=rwc);
    /// scan history is kept in memory when omitted
    #[arg(long)]
    pub database: Option<String>,

    /// JSON configuration file; CLI flags override file values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum namespaces scanned concurrently within one scan [default: 8]
    #[arg(long)]
    pub namespace_concurrency: Option<usize>,

    /// Per-namespace timeout in seconds [default: 60]
    #[arg(long)]
    pub namespace_timeout: Option<u64>,
}

impl Args {
    /// Overlay explicitly given flags onto the config; omitted flags leave the
    /// file (or default) values untouched.
    pub fn apply(&self, config: &mut ApiConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database_url = Some(database.clone());
        }
        if let Some(concurrency) = self.namespace_concurrency {
            config.namespace_concurrency = concurrency;
        }
        if let Some(timeout) = self.namespace_timeout {
            config.namespace_timeout_seconds = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_flags_do_not_clobber_file_values() {
        let mut config = ApiConfig {
            host: "10.0.0.1".to_string(),
            port: 9443,
            database_url: Some("sqlite://from-file.db?mode=rwc".to_string()),
            namespace_concurrency: 4,
            namespace_timeout_seconds: 120,
        };

        let args = Args::try_parse_from(["certwatch", "--port", "9000"]).expect("parse");
        args.apply(&mut config);

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(
            config.database_url.as_deref(),
            Some("sqlite://from-file.db?mode=rwc")
        );
        assert_eq!(config.namespace_concurrency, 4);
        assert_eq!(config.namespace_timeout_seconds, 120);
    }

    #[test]
    fn given_flags_override_file_values() {
        let mut config = ApiConfig::default();
        let args = Args::try_parse_from([
            "certwatch",
            "--host",
            "127.0.0.1",
            "--database",
            "sqlite://cli.db?mode=rwc",
            "--namespace-timeout",
            "15",
        ])
        .expect("parse");
        args.apply(&mut config);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.database_url.as_deref(), Some("sqlite://cli.db?mode=rwc"));
        assert_eq!(config.namespace_timeout_seconds, 15);
        // Untouched knobs stay at their defaults
        assert_eq!(config.port, 8080);
    }
}
