//! Example demonstrating the streaming pipeline end to end
//!
//! Wires a chunk plan through the session registry, chunk fetcher, and
//! stream producer against a small in-memory store, then drains the
//! stream the way the HTTP layer does and checks the bytes against the
//! source object.

use async_trait::async_trait;
use bytes::Bytes;
use range_relay::{
    chunk_planner, ChunkFetcher, ChunkLocation, ChunkStore, FileDescriptor, GatewayMetrics,
    Result as RelayResult, RetryPolicy, Session, SessionRegistry, StreamProducer,
};
use std::sync::Arc;
use std::time::Duration;

/// Store serving one generated object from memory
struct MemoryStore {
    data: Vec<u8>,
}

#[async_trait]
impl ChunkStore for MemoryStore {
    fn home_region(&self) -> u8 {
        1
    }

    async fn resolve(&self, object_id: i64) -> RelayResult<FileDescriptor> {
        Ok(FileDescriptor {
            region_id: 1,
            location: ChunkLocation {
                media_id: object_id,
                access_token: 0,
                thumb_size: None,
            },
            size: self.data.len() as u64,
            mime_type: Some("application/octet-stream".to_string()),
            file_name: Some("demo.bin".to_string()),
        })
    }

    async fn authenticate(&self, region_id: u8) -> RelayResult<Session> {
        Ok(Session {
            region_id,
            auth_key: "demo-key".to_string(),
            imported: false,
        })
    }

    async fn fetch(
        &self,
        _session: &Session,
        _location: &ChunkLocation,
        offset: u64,
        limit: u64,
    ) -> RelayResult<Bytes> {
        let start = (offset as usize).min(self.data.len());
        let end = (offset.saturating_add(limit) as usize).min(self.data.len());
        Ok(Bytes::copy_from_slice(&self.data[start..end]))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Range Relay Streaming Example ===\n");

    // A 3 MB object with a recognizable byte pattern
    let data: Vec<u8> = (0..3_000_000).map(|i| (i % 251) as u8).collect();
    let store = Arc::new(MemoryStore { data: data.clone() });

    let metrics = Arc::new(GatewayMetrics::new());
    let registry = Arc::new(SessionRegistry::new(
        store.clone(),
        RetryPolicy::new(3, 0),
        Duration::from_secs(5),
        Arc::clone(&metrics),
    ));
    let fetcher = ChunkFetcher::new(store.clone(), Duration::from_secs(5), Arc::clone(&metrics));
    let producer = StreamProducer::new(registry, fetcher, Arc::clone(&metrics));

    let descriptor = store.resolve(42).await?;
    println!(
        "Object 42: {} bytes, {}",
        descriptor.size,
        descriptor.mime_type.as_deref().unwrap_or("unknown type")
    );
    println!();

    // Request 1: the middle third of the object
    let (start, end) = (1_000_000u64, 1_999_999u64);
    let plan = chunk_planner::plan(descriptor.size, start, end, false)?;

    println!("Streaming bytes {}-{}:", start, end);
    println!("  Chunk size: {} bytes", plan.chunk_size);
    println!("  Aligned offset: {}", plan.aligned_offset);
    println!("  First chunk drops: {} bytes", plan.first_part_cut);
    println!("  Last chunk keeps: {} bytes", plan.last_part_cut);

    let mut rx = producer.produce(&descriptor, plan).await?;
    let mut received = Vec::with_capacity((end - start + 1) as usize);
    let mut part = 0;
    while let Some(item) = rx.recv().await {
        let chunk = item?;
        part += 1;
        println!("  Part {}: {} bytes", part, chunk.len());
        received.extend_from_slice(&chunk);
    }

    if received == data[start as usize..=end as usize] {
        println!("  ✓ {} bytes match the source object exactly", received.len());
    } else {
        println!("  ✗ Stream does not match the source object");
    }
    println!();

    // Request 2: the first 100 KB, reusing the cached session
    let plan = chunk_planner::plan(descriptor.size, 0, 99_999, false)?;
    println!("Streaming bytes 0-99999:");
    println!("  Chunk size: {} bytes", plan.chunk_size);

    let mut rx = producer.produce(&descriptor, plan).await?;
    let mut received = Vec::new();
    while let Some(item) = rx.recv().await {
        received.extend_from_slice(&item?);
    }

    if received == data[..100_000] {
        println!("  ✓ {} bytes match the source object exactly", received.len());
    } else {
        println!("  ✗ Stream does not match the source object");
    }
    println!();

    let stats = metrics.get_stats();
    println!("Metrics after both streams:");
    println!("  Chunks fetched: {}", stats.chunks_fetched);
    println!("  Bytes streamed: {}", stats.bytes_streamed);
    println!("  Sessions created: {}", stats.sessions_created);
    println!("  Session cache hits: {}", stats.session_cache_hits);
    println!("  Session reuse rate: {:.2}%", stats.session_reuse_rate());

    println!("\n=== Example completed ===");
    Ok(())
}
