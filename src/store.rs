//! Backing store contract and its HTTP implementation
//!
//! The gateway only ever talks to the chunk store through the
//! [`ChunkStore`] trait: resolve a public object id to a descriptor,
//! authenticate a session against one region, and fetch aligned chunks.
//! [`RemoteStore`] maps that contract onto the store's HTTP control API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::models::{ChunkLocation, FileDescriptor, Session};

/// Header carrying the session key on chunk fetches
const SESSION_KEY_HEADER: &str = "x-session-key";

/// Contract the gateway requires from a chunk-oriented backing store
///
/// Chunk fetches must happen at offsets that are multiples of the fetch
/// limit; the chunk planner guarantees its plans respect that.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Region the store's long-lived credential is bound to
    fn home_region(&self) -> u8;

    /// Resolve a public object id to its descriptor
    async fn resolve(&self, object_id: i64) -> Result<FileDescriptor>;

    /// Perform one authentication handshake against `region_id`
    ///
    /// For the home region this binds the stored credential directly.
    /// For any other region it exports an authorization token from the
    /// home region and imports it into the target. A single call makes
    /// exactly one handshake attempt; retrying rejected authorization
    /// bytes is the session registry's job.
    async fn authenticate(&self, region_id: u8) -> Result<Session>;

    /// Fetch one chunk of up to `limit` bytes starting at `offset`
    ///
    /// An empty result means the offset is at or past the end of the
    /// object's bytes.
    async fn fetch(
        &self,
        session: &Session,
        location: &ChunkLocation,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes>;
}

/// Authorization token minted by the home region for a cross-region import
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthToken {
    id: i64,
    bytes: String,
}

/// HTTP client for the remote chunk store
pub struct RemoteStore {
    client: Client,
    base_url: String,
    auth_token: String,
    home_region: u8,
}

impl RemoteStore {
    /// Create a new RemoteStore from the gateway configuration
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RelayError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RemoteStore {
            client,
            base_url: config.store_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            home_region: config.home_region,
        })
    }

    fn request_error(what: &str, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::Timeout(format!("{} timed out: {}", what, err))
        } else {
            RelayError::HttpError(format!("{} failed: {}", what, err))
        }
    }

    fn rate_limited(response: &Response) -> RelayError {
        let seconds = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        RelayError::RateLimited { seconds }
    }

    /// Bind the stored credential to the home region
    async fn create_home_session(&self, region_id: u8) -> Result<Session> {
        let url = format!("{}/regions/{}/sessions", self.base_url, region_id);
        debug!("Creating home session for region {}", region_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| Self::request_error("session creation", e))?;

        match response.status() {
            StatusCode::OK => {
                let session = response.json::<Session>().await.map_err(|e| {
                    RelayError::HttpError(format!("invalid session body: {}", e))
                })?;
                info!("Established home session for region {}", region_id);
                Ok(session)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Region {} rejected the stored credential", region_id);
                Err(RelayError::AuthFailure(format!(
                    "region {} rejected the stored credential",
                    region_id
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Self::rate_limited(&response)),
            status => Err(RelayError::HttpError(format!(
                "session creation returned unexpected status {}",
                status
            ))),
        }
    }

    /// Export an authorization token from the home region and import it
    /// into `region_id`, yielding a session bound to that region
    async fn import_session(&self, region_id: u8) -> Result<Session> {
        let export_url = format!("{}/regions/{}/export", self.base_url, self.home_region);
        debug!(
            "Exporting authorization from region {} for region {}",
            self.home_region, region_id
        );

        let response = self
            .client
            .post(&export_url)
            .bearer_auth(&self.auth_token)
            .json(&json!({ "target_region": region_id }))
            .send()
            .await
            .map_err(|e| Self::request_error("authorization export", e))?;

        let token = match response.status() {
            StatusCode::OK => response.json::<AuthToken>().await.map_err(|e| {
                RelayError::HttpError(format!("invalid authorization token body: {}", e))
            })?,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RelayError::AuthFailure(format!(
                    "home region {} refused to export authorization",
                    self.home_region
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(Self::rate_limited(&response)),
            status => {
                return Err(RelayError::HttpError(format!(
                    "authorization export returned unexpected status {}",
                    status
                )))
            }
        };

        let import_url = format!("{}/regions/{}/import", self.base_url, region_id);
        let response = self
            .client
            .post(&import_url)
            .bearer_auth(&self.auth_token)
            .json(&token)
            .send()
            .await
            .map_err(|e| Self::request_error("authorization import", e))?;

        match response.status() {
            StatusCode::OK => {
                let session = response.json::<Session>().await.map_err(|e| {
                    RelayError::HttpError(format!("invalid session body: {}", e))
                })?;
                info!("Established imported session for region {}", region_id);
                Ok(session)
            }
            StatusCode::CONFLICT => {
                warn!("Region {} rejected the imported authorization bytes", region_id);
                Err(RelayError::InvalidAuthBytes { region: region_id })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RelayError::AuthFailure(format!(
                    "region {} rejected the imported authorization",
                    region_id
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Self::rate_limited(&response)),
            status => Err(RelayError::HttpError(format!(
                "authorization import returned unexpected status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl ChunkStore for RemoteStore {
    fn home_region(&self) -> u8 {
        self.home_region
    }

    async fn resolve(&self, object_id: i64) -> Result<FileDescriptor> {
        let url = format!("{}/objects/{}", self.base_url, object_id);
        debug!("Resolving object {}", object_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| Self::request_error("object resolution", e))?;

        match response.status() {
            StatusCode::OK => {
                let descriptor = response.json::<FileDescriptor>().await.map_err(|e| {
                    RelayError::HttpError(format!("invalid descriptor body: {}", e))
                })?;
                debug!(
                    "Resolved object {}: region={}, size={}, mime={:?}",
                    object_id, descriptor.region_id, descriptor.size, descriptor.mime_type
                );
                Ok(descriptor)
            }
            StatusCode::NOT_FOUND => Err(RelayError::NotFound(format!(
                "object {} does not exist",
                object_id
            ))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RelayError::AuthFailure(format!(
                    "store rejected credentials while resolving object {}",
                    object_id
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Self::rate_limited(&response)),
            status => Err(RelayError::HttpError(format!(
                "object resolution returned unexpected status {}",
                status
            ))),
        }
    }

    async fn authenticate(&self, region_id: u8) -> Result<Session> {
        if region_id == self.home_region {
            self.create_home_session(region_id).await
        } else {
            self.import_session(region_id).await
        }
    }

    async fn fetch(
        &self,
        session: &Session,
        location: &ChunkLocation,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        let url = format!(
            "{}/regions/{}/objects/{}/chunk",
            self.base_url, session.region_id, location.media_id
        );

        let mut request = self
            .client
            .get(&url)
            .header(SESSION_KEY_HEADER, session.auth_key.as_str())
            .query(&[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("access_token", location.access_token.to_string()),
            ]);
        if let Some(thumb) = &location.thumb_size {
            request = request.query(&[("thumb", thumb.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::request_error("chunk fetch", e))?;

        match response.status() {
            StatusCode::OK => {
                let data = response.bytes().await.map_err(|e| {
                    RelayError::FetchFailed(format!("failed to read chunk body: {}", e))
                })?;
                debug!(
                    "Fetched {} bytes at offset {} for object {}",
                    data.len(),
                    offset,
                    location.media_id
                );
                Ok(data)
            }
            StatusCode::NOT_FOUND => Err(RelayError::NotFound(format!(
                "object {} has no chunk at offset {}",
                location.media_id, offset
            ))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Region {} rejected the session key", session.region_id);
                Err(RelayError::AuthFailure(format!(
                    "region {} rejected the session",
                    session.region_id
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Self::rate_limited(&response)),
            status => Err(RelayError::FetchFailed(format!(
                "chunk fetch returned unexpected status {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;

    #[tokio::test]
    async fn test_remote_store_creation() {
        let mut config = RelayConfig::default();
        config.auth_token = "token".to_string();
        config.home_region = 4;

        let store = RemoteStore::new(&config).unwrap();
        assert_eq!(store.home_region(), 4);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let mut config = RelayConfig::default();
        config.auth_token = "token".to_string();
        config.store_url = "http://127.0.0.1:9000/".to_string();

        let store = RemoteStore::new(&config).unwrap();
        assert_eq!(store.base_url, "http://127.0.0.1:9000");
    }
}
