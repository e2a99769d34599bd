// API Module - HTTP surface over the scan engine

pub mod config;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use server::ApiServer;
pub use state::AppState;
