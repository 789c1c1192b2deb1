//! Range Relay Server
//!
//! Main entry point for the range-relay gateway. It loads configuration,
//! sets up logging, connects the remote store client, and serves HTTP
//! until killed.

use range_relay::{Gateway, RelayConfig, RemoteStore};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

/// Main entry point for the range-relay server
///
/// # Usage
/// ```bash
/// # Start with default config (range_relay.yaml)
/// cargo run
///
/// # Start with custom config
/// cargo run -- /path/to/config.yaml
/// ```
#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Range Relay Server");

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "range_relay.yaml".to_string());

    info!("Loading configuration from: {}", config_path);

    let config = match RelayConfig::from_file(&config_path) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            info!("  - Listen address: {}", cfg.listen_address);
            info!("  - Store URL: {}", cfg.store_url);
            info!("  - Home region: {}", cfg.home_region);
            info!("  - Public URL: {}", cfg.public_url);
            info!("  - Fetch timeout: {}s", cfg.fetch_timeout_secs);
            info!("  - Handshake timeout: {}s", cfg.handshake_timeout_secs);
            info!("  - Handshake attempts: {}", cfg.handshake_max_attempts);
            Arc::new(cfg)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("Please ensure the configuration file exists and is valid");
            std::process::exit(1);
        }
    };

    let store = match RemoteStore::new(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to create store client: {}", e);
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(Gateway::new(config, store));

    if let Err(e) = gateway.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
