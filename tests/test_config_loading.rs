use std::io::Write;

use range_relay::config::RelayConfig;
use tempfile::NamedTempFile;

/// Write a YAML body to a temp file and return its handle
fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_example_config() {
    let config = RelayConfig::from_file("range_relay.yaml");
    assert!(
        config.is_ok(),
        "Failed to load example config: {:?}",
        config.err()
    );

    let config = config.unwrap();
    assert_eq!(config.listen_address, "0.0.0.0:8080");
    assert_eq!(config.store_url, "http://127.0.0.1:9000");
    assert_eq!(config.home_region, 1);
    assert_eq!(config.fetch_timeout_secs, 30);
    assert_eq!(config.handshake_timeout_secs, 15);
    assert_eq!(config.handshake_max_attempts, 3);
}

#[test]
fn test_load_minimal_config() {
    let file = write_config("auth_token: secret\n");

    let config = RelayConfig::from_file(file.path());
    assert!(config.is_ok());

    // Check defaults are applied
    let config = config.unwrap();
    assert_eq!(config.listen_address, "0.0.0.0:8080");
    assert_eq!(config.store_url, "http://127.0.0.1:9000");
    assert_eq!(config.public_url, "http://localhost:8080");
    assert_eq!(config.home_region, 1);
    assert_eq!(config.fetch_timeout_secs, 30);
    assert_eq!(config.rate_limit_max_retries, 2);
    assert_eq!(config.max_rate_limit_wait_secs, 60);
}

#[test]
fn test_load_config_with_overrides() {
    let file = write_config(
        r#"
auth_token: secret
listen_address: "127.0.0.1:9999"
store_url: "https://store.internal:8443"
home_region: 4
fetch_timeout_secs: 5
handshake_max_attempts: 5
"#,
    );

    let config = RelayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.listen_address, "127.0.0.1:9999");
    assert_eq!(config.store_url, "https://store.internal:8443");
    assert_eq!(config.home_region, 4);
    assert_eq!(config.fetch_timeout_secs, 5);
    assert_eq!(config.handshake_max_attempts, 5);
    // Untouched keys keep their defaults
    assert_eq!(config.handshake_timeout_secs, 15);
}

#[test]
fn test_load_config_missing_auth_token() {
    let file = write_config("home_region: 2\n");

    let config = RelayConfig::from_file(file.path());
    assert!(config.is_err(), "Should fail validation without auth_token");
}

#[test]
fn test_load_config_invalid_values() {
    let file = write_config("auth_token: secret\nfetch_timeout_secs: 0\n");
    assert!(RelayConfig::from_file(file.path()).is_err());

    let file = write_config("auth_token: secret\nhome_region: 0\n");
    assert!(RelayConfig::from_file(file.path()).is_err());

    let file = write_config("auth_token: secret\nstore_url: \"ftp://store\"\n");
    assert!(RelayConfig::from_file(file.path()).is_err());

    let file = write_config("auth_token: secret\nhandshake_max_attempts: 0\n");
    assert!(RelayConfig::from_file(file.path()).is_err());
}

#[test]
fn test_load_config_malformed_yaml() {
    let file = write_config("auth_token: [unclosed\n");
    assert!(RelayConfig::from_file(file.path()).is_err());
}

#[test]
fn test_load_nonexistent_file() {
    let config = RelayConfig::from_file("nonexistent.yaml");
    assert!(config.is_err(), "Should fail when file doesn't exist");
}
