//! Example demonstrating gateway construction and configuration
//!
//! This example shows how to programmatically create and configure a
//! Gateway instance, similar to what the main server binary does.

use range_relay::{Gateway, RelayConfig, RemoteStore};
use std::sync::Arc;

fn main() {
    println!("=== Range Relay Server Example ===\n");

    // Example 1: The default configuration
    println!("1. Default configuration:");
    let default_config = RelayConfig::default();
    println!("   Listen address: {}", default_config.listen_address);
    println!("   Store URL: {}", default_config.store_url);
    println!("   Home region: {}", default_config.home_region);
    println!("   Fetch timeout: {}s", default_config.fetch_timeout_secs);
    println!("   Handshake timeout: {}s", default_config.handshake_timeout_secs);
    println!("   Handshake attempts: {}", default_config.handshake_max_attempts);
    match default_config.validate() {
        Ok(_) => println!("   ✗ Default config should not validate"),
        Err(e) => println!("   ✓ Defaults alone do not validate: {}\n", e),
    }

    // Example 2: A custom configuration wired into a gateway
    println!("2. Creating a Gateway with a custom configuration:");
    let custom_config = RelayConfig {
        listen_address: "0.0.0.0:8081".to_string(),
        store_url: "http://store.internal:9000".to_string(),
        auth_token: "example-token".to_string(),
        home_region: 2,
        public_url: "https://media.example.com".to_string(),
        fetch_timeout_secs: 20,
        handshake_timeout_secs: 10,
        handshake_max_attempts: 3,
        rate_limit_max_retries: 2,
        max_rate_limit_wait_secs: 30,
    };

    match custom_config.validate() {
        Ok(_) => println!("   ✓ Custom config validates"),
        Err(e) => println!("   ✗ Error: {}", e),
    }

    let config = Arc::new(custom_config);
    let store = Arc::new(RemoteStore::new(&config).expect("store client"));
    let gateway = Arc::new(Gateway::new(Arc::clone(&config), store));

    println!("   Listen address: {}", gateway.config().listen_address);
    println!("   Store URL: {}", gateway.config().store_url);
    println!("   Home region: {}", gateway.config().home_region);

    let stats = gateway.metrics().get_stats();
    println!("   Initial metrics:");
    println!("     Total requests: {}", stats.http_requests);
    println!("     Sessions created: {}", stats.sessions_created);
    println!();

    // Example 3: Load from the shipped YAML file
    println!("3. Loading configuration from range_relay.yaml:");
    match RelayConfig::from_file("range_relay.yaml") {
        Ok(yaml_config) => {
            println!("   Configuration loaded successfully!");
            println!("   Listen address: {}", yaml_config.listen_address);
            println!("   Store URL: {}", yaml_config.store_url);
            println!("   Public URL: {}", yaml_config.public_url);
            println!("   Handshake attempts: {}", yaml_config.handshake_max_attempts);
        }
        Err(e) => {
            println!("   Error loading config: {}", e);
        }
    }

    // Example 4: Configuration validation
    println!("\n4. Testing configuration validation:");

    let mut bad = RelayConfig {
        auth_token: "token".to_string(),
        ..Default::default()
    };
    bad.listen_address = "localhost".to_string();
    match bad.validate() {
        Ok(_) => println!("   ✗ Invalid listen address should have been rejected"),
        Err(e) => println!("   ✓ Invalid listen address rejected: {}", e),
    }

    let mut bad = RelayConfig {
        auth_token: "token".to_string(),
        ..Default::default()
    };
    bad.store_url = "ftp://store".to_string();
    match bad.validate() {
        Ok(_) => println!("   ✗ Non-http store URL should have been rejected"),
        Err(e) => println!("   ✓ Non-http store URL rejected: {}", e),
    }

    let mut bad = RelayConfig {
        auth_token: "token".to_string(),
        ..Default::default()
    };
    bad.home_region = 0;
    match bad.validate() {
        Ok(_) => println!("   ✗ Zero home region should have been rejected"),
        Err(e) => println!("   ✓ Zero home region rejected: {}", e),
    }

    let mut bad = RelayConfig {
        auth_token: "token".to_string(),
        ..Default::default()
    };
    bad.fetch_timeout_secs = 10_000;
    match bad.validate() {
        Ok(_) => println!("   ✗ Oversized timeout should have been rejected"),
        Err(e) => println!("   ✓ Oversized timeout rejected: {}", e),
    }

    // Example 5: Serving
    println!("\n5. Serving:");
    println!("   Inside a tokio runtime, gateway.start() binds the listen");
    println!("   address and serves until failure. Try it against a store:");
    println!();
    println!("   # Whole object");
    println!("   curl http://localhost:8081/42/video.mp4 -o out.mp4");
    println!();
    println!("   # Byte range");
    println!("   curl -H 'Range: bytes=0-1048575' http://localhost:8081/42/video.mp4");
    println!();
    println!("   # Metrics");
    println!("   curl http://localhost:8081/metrics");

    println!("\n=== Example completed successfully ===");
}
