//! Chunk fetcher
//!
//! Thin wrapper around [`ChunkStore::fetch`] that enforces the per-fetch
//! timeout and keeps the fetch counters honest. Fetches are never retried
//! here: a failed chunk terminates its stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::metrics::GatewayMetrics;
use crate::models::{ChunkLocation, Session};
use crate::store::ChunkStore;

/// Fetches aligned chunks from the backing store
#[derive(Clone)]
pub struct ChunkFetcher {
    store: Arc<dyn ChunkStore>,
    fetch_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl ChunkFetcher {
    /// Create a new ChunkFetcher
    pub fn new(
        store: Arc<dyn ChunkStore>,
        fetch_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        ChunkFetcher {
            store,
            fetch_timeout,
            metrics,
        }
    }

    /// Fetch one chunk of up to `limit` bytes at `offset`
    ///
    /// `offset` must be a multiple of `limit`; plans produced by the
    /// chunk planner always are. An empty result means the store has no
    /// bytes at or past `offset`.
    pub async fn fetch_chunk(
        &self,
        session: &Session,
        location: &ChunkLocation,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        debug_assert_eq!(offset % limit, 0, "chunk fetches must stay grid-aligned");

        let started = Instant::now();
        match timeout(
            self.fetch_timeout,
            self.store.fetch(session, location, offset, limit),
        )
        .await
        {
            Ok(Ok(data)) => {
                self.metrics.record_chunk_fetch(true);
                self.metrics.record_chunk_fetch_duration(started.elapsed());
                debug!(
                    "Chunk fetch ok: offset={}, limit={}, got={} bytes",
                    offset,
                    limit,
                    data.len()
                );
                Ok(data)
            }
            Ok(Err(e)) => {
                self.metrics.record_chunk_fetch(false);
                Err(e)
            }
            Err(_) => {
                self.metrics.record_chunk_fetch(false);
                Err(RelayError::Timeout(format!(
                    "chunk fetch at offset {} timed out",
                    offset
                )))
            }
        }
    }
}
