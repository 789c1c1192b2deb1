//! Session registry
//!
//! Sessions are expensive to establish, and cross-region ones take an
//! export/import handshake that the store may reject a few times before
//! accepting. The registry keeps at most one live session per region and
//! shares it across all requests. Concurrent first requests for the same
//! region collapse into a single handshake, requests for different
//! regions proceed independently, and a failed handshake is never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::metrics::GatewayMetrics;
use crate::models::Session;
use crate::retry::RetryPolicy;
use crate::store::ChunkStore;

/// Per-region session cache in front of a [`ChunkStore`]
pub struct SessionRegistry {
    store: Arc<dyn ChunkStore>,
    sessions: RwLock<HashMap<u8, Arc<Session>>>,
    creation_locks: Mutex<HashMap<u8, Arc<TokioMutex<()>>>>,
    handshake_policy: RetryPolicy,
    handshake_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl SessionRegistry {
    /// Create a new SessionRegistry
    ///
    /// # Arguments
    /// * `store` - Backing store that performs the actual handshakes
    /// * `handshake_policy` - Retry policy for rejected authorization bytes
    /// * `handshake_timeout` - Budget for a single handshake attempt
    /// * `metrics` - Shared metrics collector
    pub fn new(
        store: Arc<dyn ChunkStore>,
        handshake_policy: RetryPolicy,
        handshake_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        SessionRegistry {
            store,
            sessions: RwLock::new(HashMap::new()),
            creation_locks: Mutex::new(HashMap::new()),
            handshake_policy,
            handshake_timeout,
            metrics,
        }
    }

    /// Get the session for `region_id`, establishing it on first use
    ///
    /// Returns the cached session when one exists. Otherwise performs the
    /// handshake under a per-region creation lock so that concurrent
    /// requests for the same region wait for one handshake instead of
    /// racing their own. Rejected authorization bytes are retried within
    /// the configured attempt budget; if every attempt fails the error is
    /// returned and nothing is cached, so the next request starts fresh.
    pub async fn get_session(&self, region_id: u8) -> Result<Arc<Session>> {
        if let Some(session) = self.cached(region_id) {
            self.metrics.record_session_cache_hit();
            return Ok(session);
        }

        let creation_lock = self.creation_lock(region_id);
        let _guard = creation_lock.lock().await;

        // Another request may have finished the handshake while we waited
        if let Some(session) = self.cached(region_id) {
            self.metrics.record_session_cache_hit();
            return Ok(session);
        }

        debug!(
            "No session for region {} (home region {}), starting handshake",
            region_id,
            self.store.home_region()
        );

        let handshake_timeout = self.handshake_timeout;
        let attempts = AtomicU64::new(0);
        let session = self
            .handshake_policy
            .run("session handshake", || {
                if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                    self.metrics.record_handshake_retry();
                }
                let store = Arc::clone(&self.store);
                async move {
                    match timeout(handshake_timeout, store.authenticate(region_id)).await {
                        Ok(result) => result,
                        Err(_) => Err(RelayError::Timeout(format!(
                            "session handshake with region {} timed out",
                            region_id
                        ))),
                    }
                }
            })
            .await?;

        let session = Arc::new(session);
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(region_id, Arc::clone(&session));
        }
        self.metrics.record_session_created(session.imported);
        info!(
            "Session established for region {} (imported: {})",
            region_id, session.imported
        );
        Ok(session)
    }

    /// Drop the cached session for `region_id`
    ///
    /// Called when a region stops accepting an established session key;
    /// the next request for the region performs a fresh handshake.
    pub fn invalidate(&self, region_id: u8) {
        if let Ok(mut sessions) = self.sessions.write() {
            if sessions.remove(&region_id).is_some() {
                warn!("Invalidated session for region {}", region_id);
            }
        }
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    fn cached(&self, region_id: u8) -> Option<Arc<Session>> {
        self.sessions.read().ok()?.get(&region_id).cloned()
    }

    fn creation_lock(&self, region_id: u8) -> Arc<TokioMutex<()>> {
        if let Ok(mut locks) = self.creation_locks.lock() {
            locks
                .entry(region_id)
                .or_insert_with(|| Arc::new(TokioMutex::new(())))
                .clone()
        } else {
            // Poisoned map: fall back to an unshared lock; the handshake
            // still works, it just loses single-flight for this call
            Arc::new(TokioMutex::new(()))
        }
    }
}
