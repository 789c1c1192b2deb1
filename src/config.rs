//! Configuration management for the range-relay gateway

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Configuration for the relay gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address the gateway listens on (default: "0.0.0.0:8080")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Base URL of the chunk store's control API (default: "http://127.0.0.1:9000")
    #[serde(default = "default_store_url")]
    pub store_url: String,

    /// Long-lived credential bound to the home region (required)
    #[serde(default)]
    pub auth_token: String,

    /// Region the credential is bound to (default: 1)
    #[serde(default = "default_home_region")]
    pub home_region: u8,

    /// Public base URL used when rendering player page links
    /// (default: "http://localhost:8080")
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Timeout for a single chunk fetch in seconds (default: 30)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for a single session handshake attempt in seconds (default: 15)
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Attempts allowed per session handshake, including the first (default: 3)
    #[serde(default = "default_handshake_attempts")]
    pub handshake_max_attempts: usize,

    /// Retries allowed when the store rate-limits a control call (default: 2)
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_max_retries: usize,

    /// Longest single wait honored for a rate-limit delay in seconds
    /// (default: 60)
    #[serde(default = "default_max_rate_limit_wait")]
    pub max_rate_limit_wait_secs: u64,
}

// Default value functions for serde
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_store_url() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_home_region() -> u8 {
    1
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_handshake_timeout() -> u64 {
    15
}

fn default_handshake_attempts() -> usize {
    3
}

fn default_rate_limit_retries() -> usize {
    2
}

fn default_max_rate_limit_wait() -> u64 {
    60
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            listen_address: default_listen_address(),
            store_url: default_store_url(),
            auth_token: String::new(),
            home_region: default_home_region(),
            public_url: default_public_url(),
            fetch_timeout_secs: default_fetch_timeout(),
            handshake_timeout_secs: default_handshake_timeout(),
            handshake_max_attempts: default_handshake_attempts(),
            rate_limit_max_retries: default_rate_limit_retries(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(RelayConfig)` if loading and validation succeed
    /// * `Err(RelayError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| RelayError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: RelayConfig = serde_yaml::from_str(&content)
            .map_err(|e| RelayError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - listen_address must look like host:port
    /// - store_url and public_url must be http(s) URLs
    /// - auth_token must not be empty
    /// - home_region must be non-zero
    /// - timeouts must be between 1 and 300 seconds
    /// - handshake_max_attempts must be between 1 and 10
    /// - rate_limit_max_retries must be at most 10
    /// - max_rate_limit_wait_secs must be between 1 and 3600
    pub fn validate(&self) -> Result<()> {
        const MIN_TIMEOUT_SECS: u64 = 1;
        const MAX_TIMEOUT_SECS: u64 = 300;
        const MAX_HANDSHAKE_ATTEMPTS: usize = 10;
        const MAX_RATE_LIMIT_RETRIES: usize = 10;
        const MAX_RATE_LIMIT_WAIT_SECS: u64 = 3600;

        if !self.listen_address.contains(':') {
            return Err(RelayError::ConfigError(format!(
                "listen_address must be host:port, got '{}'",
                self.listen_address
            )));
        }

        if !self.store_url.starts_with("http://") && !self.store_url.starts_with("https://") {
            return Err(RelayError::ConfigError(format!(
                "store_url must be an http(s) URL, got '{}'",
                self.store_url
            )));
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            return Err(RelayError::ConfigError(format!(
                "public_url must be an http(s) URL, got '{}'",
                self.public_url
            )));
        }

        if self.auth_token.is_empty() {
            return Err(RelayError::ConfigError(
                "auth_token must not be empty".to_string(),
            ));
        }

        if self.home_region == 0 {
            return Err(RelayError::ConfigError(
                "home_region must be non-zero".to_string(),
            ));
        }

        if self.fetch_timeout_secs < MIN_TIMEOUT_SECS || self.fetch_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(RelayError::ConfigError(format!(
                "fetch_timeout_secs must be between {} and {}, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, self.fetch_timeout_secs
            )));
        }

        if self.handshake_timeout_secs < MIN_TIMEOUT_SECS
            || self.handshake_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(RelayError::ConfigError(format!(
                "handshake_timeout_secs must be between {} and {}, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, self.handshake_timeout_secs
            )));
        }

        if self.handshake_max_attempts == 0 || self.handshake_max_attempts > MAX_HANDSHAKE_ATTEMPTS
        {
            return Err(RelayError::ConfigError(format!(
                "handshake_max_attempts must be between 1 and {}, got {}",
                MAX_HANDSHAKE_ATTEMPTS, self.handshake_max_attempts
            )));
        }

        if self.rate_limit_max_retries > MAX_RATE_LIMIT_RETRIES {
            return Err(RelayError::ConfigError(format!(
                "rate_limit_max_retries must be at most {}, got {}",
                MAX_RATE_LIMIT_RETRIES, self.rate_limit_max_retries
            )));
        }

        if self.max_rate_limit_wait_secs == 0
            || self.max_rate_limit_wait_secs > MAX_RATE_LIMIT_WAIT_SECS
        {
            return Err(RelayError::ConfigError(format!(
                "max_rate_limit_wait_secs must be between 1 and {}, got {}",
                MAX_RATE_LIMIT_WAIT_SECS, self.max_rate_limit_wait_secs
            )));
        }

        Ok(())
    }

    /// Chunk fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Session handshake timeout as a Duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Rate-limit wait cap as a Duration
    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }
}
