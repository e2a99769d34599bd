// certwatch - Certificate expiry scanner for Kubernetes Secrets and ConfigMaps

use anyhow::Result;
use certwatch::api::{ApiConfig, ApiServer};
use certwatch::store::{MemoryStore, ScanStore, SqliteStore};
use certwatch::Args;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let args = Args::parse();

    // Load configuration from file if given, then apply CLI arguments on top
    let mut config = if let Some(config_path) = &args.config {
        ApiConfig::from_file(
            config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid config file path"))?,
        )?
    } else {
        ApiConfig::default()
    };
    args.apply(&mut config);

    let store: Arc<dyn ScanStore> = match &config.database_url {
        Some(url) => {
            info!("using SQLite store at {}", url);
            Arc::new(SqliteStore::connect(url).await?)
        }
        None => {
            info!("using in-memory store (scan history is not persisted across restarts)");
            Arc::new(MemoryStore::new())
        }
    };

    let server = ApiServer::new(config, store);
    server.run().await
}
