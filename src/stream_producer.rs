//! Stream producer
//!
//! Turns a chunk plan into an ordered stream of trimmed byte buffers.
//! The producer runs in its own task and stays one chunk ahead of the
//! client: while the consumer drains part N, part N+1 is already being
//! fetched. The channel holds a single buffer, so a stalled client
//! applies backpressure instead of letting the producer race ahead.
//!
//! A chunk fetch that fails mid-stream is never retried. The response
//! headers were committed before the first fetch, so the only honest
//! move left is to log it, surface one error frame, and stop.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::chunk_fetcher::ChunkFetcher;
use crate::error::{RelayError, Result};
use crate::metrics::GatewayMetrics;
use crate::models::{ChunkLocation, ChunkPlan, FileDescriptor, Session};
use crate::session_registry::SessionRegistry;

/// Receiving half of a produced stream
pub type ChunkReceiver = mpsc::Receiver<Result<Bytes>>;

/// Streams planned chunk ranges out of the backing store
pub struct StreamProducer {
    registry: Arc<SessionRegistry>,
    fetcher: ChunkFetcher,
    metrics: Arc<GatewayMetrics>,
}

impl StreamProducer {
    /// Create a new StreamProducer
    pub fn new(
        registry: Arc<SessionRegistry>,
        fetcher: ChunkFetcher,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        StreamProducer {
            registry,
            fetcher,
            metrics,
        }
    }

    /// Start streaming `plan` for the object in `descriptor`
    ///
    /// The region session is acquired before this returns, so an
    /// authentication failure still surfaces as a proper error response.
    /// Everything after that happens in a spawned task feeding the
    /// returned receiver; once the headers go out, fetch failures can
    /// only truncate the body.
    pub async fn produce(
        &self,
        descriptor: &FileDescriptor,
        plan: ChunkPlan,
    ) -> Result<ChunkReceiver> {
        let session = self.registry.get_session(descriptor.region_id).await?;
        let (tx, rx) = mpsc::channel(1);

        let job = StreamJob {
            fetcher: self.fetcher.clone(),
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            session,
            location: descriptor.location.clone(),
            plan,
            tx,
        };
        tokio::spawn(job.run());

        Ok(rx)
    }
}

/// One in-flight stream, owned by its producer task
struct StreamJob {
    fetcher: ChunkFetcher,
    registry: Arc<SessionRegistry>,
    metrics: Arc<GatewayMetrics>,
    session: Arc<Session>,
    location: ChunkLocation,
    plan: ChunkPlan,
    tx: mpsc::Sender<Result<Bytes>>,
}

impl StreamJob {
    async fn run(self) {
        let plan = self.plan;
        let mut offset = plan.aligned_offset;

        let mut chunk = match self.fetch(offset).await {
            Some(chunk) => chunk,
            None => return,
        };

        let mut part = 1u64;
        while part <= plan.part_count {
            if chunk.is_empty() {
                debug!("Store reported end of object at offset {}", offset);
                break;
            }

            let trimmed = plan.cut_for_part(part, &chunk);
            let trimmed_len = trimmed.len() as u64;
            if self.tx.send(Ok(trimmed)).await.is_err() {
                debug!(
                    "Client went away at part {}/{}, aborting stream",
                    part, plan.part_count
                );
                return;
            }
            self.metrics.record_bytes_streamed(trimmed_len);

            offset += plan.chunk_size;
            if part < plan.part_count {
                chunk = match self.fetch(offset).await {
                    Some(next) => next,
                    None => return,
                };
            }
            part += 1;
        }

        debug!(
            "Stream complete: {} parts from offset {}",
            plan.part_count, plan.aligned_offset
        );
    }

    /// Fetch one chunk; on failure mark the stream truncated, surface
    /// the error frame, and signal the run loop to stop
    async fn fetch(&self, offset: u64) -> Option<Bytes> {
        match self
            .fetcher
            .fetch_chunk(&self.session, &self.location, offset, self.plan.chunk_size)
            .await
        {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                error!(
                    "Chunk fetch failed mid-stream at offset {}, terminating: {}",
                    offset, e
                );
                if matches!(e, RelayError::AuthFailure(_)) {
                    self.registry.invalidate(self.session.region_id);
                }
                self.metrics.record_truncated_stream();
                let _ = self.tx.send(Err(e)).await;
                None
            }
        }
    }
}
