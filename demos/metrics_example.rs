//! Example demonstrating the GatewayMetrics usage
//!
//! This example shows how to use the metrics collector to track
//! requests, chunk fetches, sessions, and latencies, and how the same
//! snapshot turns into the Prometheus text served at /metrics.

use range_relay::metrics::render_prometheus;
use range_relay::{GatewayMetrics, MetricsSnapshot};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== Range Relay Metrics Example ===\n");

    let metrics = Arc::new(GatewayMetrics::new());

    // Example 1: Recording request traffic
    println!("Example 1: Recording requests");
    metrics.record_http_request();
    metrics.record_http_request();
    metrics.record_http_request();
    metrics.record_media_request(true); // Ranged request
    metrics.record_media_request(true); // Ranged request
    metrics.record_media_request(false); // Whole-object request

    let stats = metrics.get_stats();
    println!("Total requests: {}", stats.http_requests);
    println!("Ranged requests: {}", stats.ranged_requests);
    println!("Full requests: {}", stats.full_requests);
    println!();

    // Example 2: Recording chunk fetches
    println!("Example 2: Recording chunk fetches");
    metrics.record_chunk_fetch(true);
    metrics.record_chunk_fetch(true);
    metrics.record_chunk_fetch(true);
    metrics.record_chunk_fetch(false);

    let stats = metrics.get_stats();
    println!("Chunks fetched: {}", stats.chunks_fetched);
    println!("Fetch failures: {}", stats.chunk_fetch_failures);
    println!("Failure rate: {:.2}%", stats.chunk_fetch_failure_rate());
    println!();

    // Example 3: Recording session activity
    println!("Example 3: Recording sessions");
    metrics.record_session_created(false); // Home region
    metrics.record_session_created(true); // Cross-region import
    metrics.record_session_cache_hit();
    metrics.record_session_cache_hit();
    metrics.record_session_cache_hit();
    metrics.record_handshake_retry();

    let stats = metrics.get_stats();
    println!("Sessions created: {}", stats.sessions_created);
    println!("Imported sessions: {}", stats.imported_sessions);
    println!("Cache hits: {}", stats.session_cache_hits);
    println!("Reuse rate: {:.2}%", stats.session_reuse_rate());
    println!();

    // Example 4: Recording streamed bytes
    println!("Example 4: Recording byte transfers");
    metrics.record_bytes_streamed(1024 * 1024); // 1 MB delivered
    metrics.record_bytes_streamed(512 * 1024); // 512 KB delivered
    metrics.record_truncated_stream();

    let stats = metrics.get_stats();
    println!("Bytes streamed: {} KB", stats.bytes_streamed / 1024);
    println!("Truncated streams: {}", stats.truncated_streams);
    println!();

    // Example 5: Recording latencies
    println!("Example 5: Recording latencies");
    metrics.record_request_duration(Duration::from_millis(150));
    metrics.record_request_duration(Duration::from_millis(200));
    metrics.record_request_duration(Duration::from_millis(100));
    metrics.record_chunk_fetch_duration(Duration::from_millis(40));
    metrics.record_chunk_fetch_duration(Duration::from_millis(60));

    let stats = metrics.get_stats();
    println!("Average request duration: {:.2} ms", stats.avg_request_duration_ms());
    println!(
        "Average chunk fetch duration: {:.2} ms",
        stats.avg_chunk_fetch_duration_ms()
    );
    println!();

    // Example 6: Thread-safe concurrent access
    println!("Example 6: Concurrent metrics collection");
    let mut handles = vec![];

    // Spawn 5 threads, each recording 10 requests
    for i in 0..5 {
        let metrics_thread = Arc::clone(&metrics);
        let handle = thread::spawn(move || {
            for _ in 0..10 {
                metrics_thread.record_http_request();
                metrics_thread.record_chunk_fetch(true);
                thread::sleep(Duration::from_millis(1));
            }
            println!("Thread {} completed", i);
        });
        handles.push(handle);
    }

    // Wait for all threads
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = metrics.get_stats();
    println!("Total requests after concurrent access: {}", stats.http_requests);
    println!("Chunks fetched after concurrent access: {}", stats.chunks_fetched);
    println!();

    // Example 7: Getting a complete snapshot
    println!("Example 7: Complete metrics snapshot");
    print_metrics_snapshot(&stats);

    // Example 8: Prometheus rendering, as served at /metrics
    println!("\nExample 8: Prometheus text exposition (first lines)");
    for line in render_prometheus(&stats).lines().take(11) {
        println!("   {}", line);
    }
    println!("   ...");

    // Example 9: Resetting metrics
    println!("\nExample 9: Resetting metrics");
    metrics.reset();
    let stats = metrics.get_stats();
    println!("Total requests after reset: {}", stats.http_requests);
    println!("Bytes streamed after reset: {}", stats.bytes_streamed);
}

fn print_metrics_snapshot(snapshot: &MetricsSnapshot) {
    println!("┌─────────────────────────────────────────┐");
    println!("│         Metrics Snapshot                │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Requests:                               │");
    println!("│   Total: {:>30} │", snapshot.http_requests);
    println!("│   Ranged: {:>29} │", snapshot.ranged_requests);
    println!("│   Full: {:>31} │", snapshot.full_requests);
    println!("│   Failed: {:>29} │", snapshot.failed_requests);
    println!("├─────────────────────────────────────────┤");
    println!("│ Chunks:                                 │");
    println!("│   Fetched: {:>28} │", snapshot.chunks_fetched);
    println!("│   Failures: {:>27} │", snapshot.chunk_fetch_failures);
    println!("│   Failure Rate: {:>22.2}% │", snapshot.chunk_fetch_failure_rate());
    println!("├─────────────────────────────────────────┤");
    println!("│ Bytes:                                  │");
    println!("│   Streamed: {:>24} KB │", snapshot.bytes_streamed / 1024);
    println!("│   Truncated Streams: {:>18} │", snapshot.truncated_streams);
    println!("├─────────────────────────────────────────┤");
    println!("│ Sessions:                               │");
    println!("│   Created: {:>28} │", snapshot.sessions_created);
    println!("│   Imported: {:>27} │", snapshot.imported_sessions);
    println!("│   Cache Hits: {:>25} │", snapshot.session_cache_hits);
    println!("│   Reuse Rate: {:>24.2}% │", snapshot.session_reuse_rate());
    println!("├─────────────────────────────────────────┤");
    println!("│ Latencies:                              │");
    println!("│   Avg Request: {:>21.2} ms │", snapshot.avg_request_duration_ms());
    println!("│   Avg Fetch: {:>23.2} ms │", snapshot.avg_chunk_fetch_duration_ms());
    println!("└─────────────────────────────────────────┘");
}
