//! Metrics collection for the relay gateway
//!
//! This module provides thread-safe metrics collection using atomic
//! operations. It tracks requests, chunk fetches, session handshakes, and
//! latencies, and renders the counters in Prometheus text format for the
//! /metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for the relay gateway
///
/// All operations are thread-safe using atomic operations.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request statistics
    http_requests: AtomicU64,
    ranged_requests: AtomicU64,
    full_requests: AtomicU64,
    failed_requests: AtomicU64,

    // Chunk fetch statistics
    chunks_fetched: AtomicU64,
    chunk_fetch_failures: AtomicU64,

    // Byte statistics
    bytes_streamed: AtomicU64,
    truncated_streams: AtomicU64,

    // Session statistics
    sessions_created: AtomicU64,
    imported_sessions: AtomicU64,
    session_cache_hits: AtomicU64,
    handshake_retries: AtomicU64,
    rate_limit_retries: AtomicU64,

    // Latency statistics (stored as microseconds)
    total_request_duration_us: AtomicU64,
    total_chunk_fetch_duration_us: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub http_requests: u64,
    pub ranged_requests: u64,
    pub full_requests: u64,
    pub failed_requests: u64,

    pub chunks_fetched: u64,
    pub chunk_fetch_failures: u64,

    pub bytes_streamed: u64,
    pub truncated_streams: u64,

    pub sessions_created: u64,
    pub imported_sessions: u64,
    pub session_cache_hits: u64,
    pub handshake_retries: u64,
    pub rate_limit_retries: u64,

    pub total_request_duration_us: u64,
    pub total_chunk_fetch_duration_us: u64,
}

impl GatewayMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one HTTP request hitting the gateway, media or otherwise
    pub fn record_http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a media request
    ///
    /// # Arguments
    /// * `ranged` - Whether the client sent a Range header
    pub fn record_media_request(&self, ranged: bool) {
        if ranged {
            self.ranged_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.full_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request that ended in an error response
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk fetch
    ///
    /// # Arguments
    /// * `success` - Whether the fetch succeeded
    pub fn record_chunk_fetch(&self, success: bool) {
        self.chunks_fetched.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.chunk_fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record bytes handed to a client
    pub fn record_bytes_streamed(&self, bytes: u64) {
        self.bytes_streamed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a stream that terminated before delivering its full range
    pub fn record_truncated_stream(&self) {
        self.truncated_streams.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a freshly established session
    ///
    /// # Arguments
    /// * `imported` - Whether the session came from a cross-region handshake
    pub fn record_session_created(&self, imported: bool) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        if imported {
            self.imported_sessions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request served by an already-cached session
    pub fn record_session_cache_hit(&self) {
        self.session_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a repeated handshake attempt
    pub fn record_handshake_retry(&self) {
        self.handshake_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a control call retried because the store rate-limited it
    pub fn record_rate_limit_retry(&self) {
        self.rate_limit_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record request duration
    pub fn record_request_duration(&self, duration: Duration) {
        self.total_request_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record chunk fetch duration
    pub fn record_chunk_fetch_duration(&self, duration: Duration) {
        self.total_chunk_fetch_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Returns a point-in-time snapshot of all metrics. Note that due to
    /// the concurrent nature of the system, the snapshot may not be
    /// perfectly consistent across all fields.
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http_requests: self.http_requests.load(Ordering::Relaxed),
            ranged_requests: self.ranged_requests.load(Ordering::Relaxed),
            full_requests: self.full_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            chunks_fetched: self.chunks_fetched.load(Ordering::Relaxed),
            chunk_fetch_failures: self.chunk_fetch_failures.load(Ordering::Relaxed),
            bytes_streamed: self.bytes_streamed.load(Ordering::Relaxed),
            truncated_streams: self.truncated_streams.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            imported_sessions: self.imported_sessions.load(Ordering::Relaxed),
            session_cache_hits: self.session_cache_hits.load(Ordering::Relaxed),
            handshake_retries: self.handshake_retries.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            total_request_duration_us: self.total_request_duration_us.load(Ordering::Relaxed),
            total_chunk_fetch_duration_us: self
                .total_chunk_fetch_duration_us
                .load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    ///
    /// This is primarily useful for testing.
    pub fn reset(&self) {
        self.http_requests.store(0, Ordering::Relaxed);
        self.ranged_requests.store(0, Ordering::Relaxed);
        self.full_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.chunks_fetched.store(0, Ordering::Relaxed);
        self.chunk_fetch_failures.store(0, Ordering::Relaxed);
        self.bytes_streamed.store(0, Ordering::Relaxed);
        self.truncated_streams.store(0, Ordering::Relaxed);
        self.sessions_created.store(0, Ordering::Relaxed);
        self.imported_sessions.store(0, Ordering::Relaxed);
        self.session_cache_hits.store(0, Ordering::Relaxed);
        self.handshake_retries.store(0, Ordering::Relaxed);
        self.rate_limit_retries.store(0, Ordering::Relaxed);
        self.total_request_duration_us.store(0, Ordering::Relaxed);
        self.total_chunk_fetch_duration_us.store(0, Ordering::Relaxed);
    }
}

impl MetricsSnapshot {
    /// Calculate chunk fetch failure rate as a percentage (0.0 to 100.0)
    pub fn chunk_fetch_failure_rate(&self) -> f64 {
        if self.chunks_fetched == 0 {
            0.0
        } else {
            (self.chunk_fetch_failures as f64 / self.chunks_fetched as f64) * 100.0
        }
    }

    /// Calculate session reuse rate as a percentage (0.0 to 100.0)
    pub fn session_reuse_rate(&self) -> f64 {
        let total = self.session_cache_hits + self.sessions_created;
        if total == 0 {
            0.0
        } else {
            (self.session_cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate average request duration in milliseconds
    pub fn avg_request_duration_ms(&self) -> f64 {
        if self.http_requests == 0 {
            0.0
        } else {
            (self.total_request_duration_us as f64 / self.http_requests as f64) / 1000.0
        }
    }

    /// Calculate average chunk fetch duration in milliseconds
    pub fn avg_chunk_fetch_duration_ms(&self) -> f64 {
        if self.chunks_fetched == 0 {
            0.0
        } else {
            (self.total_chunk_fetch_duration_us as f64 / self.chunks_fetched as f64) / 1000.0
        }
    }
}

/// Render a metrics snapshot in Prometheus text exposition format
pub fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut output = String::new();

    // Request metrics
    output.push_str("# HELP range_relay_http_requests_total Total number of HTTP requests processed\n");
    output.push_str("# TYPE range_relay_http_requests_total counter\n");
    output.push_str(&format!(
        "range_relay_http_requests_total {}\n",
        snapshot.http_requests
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_ranged_requests_total Number of media requests with a Range header\n");
    output.push_str("# TYPE range_relay_ranged_requests_total counter\n");
    output.push_str(&format!(
        "range_relay_ranged_requests_total {}\n",
        snapshot.ranged_requests
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_full_requests_total Number of media requests for the whole object\n");
    output.push_str("# TYPE range_relay_full_requests_total counter\n");
    output.push_str(&format!(
        "range_relay_full_requests_total {}\n",
        snapshot.full_requests
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_failed_requests_total Number of requests that ended in an error response\n");
    output.push_str("# TYPE range_relay_failed_requests_total counter\n");
    output.push_str(&format!(
        "range_relay_failed_requests_total {}\n",
        snapshot.failed_requests
    ));
    output.push_str("\n");

    // Chunk fetch metrics
    output.push_str("# HELP range_relay_chunks_fetched_total Total number of chunk fetches issued\n");
    output.push_str("# TYPE range_relay_chunks_fetched_total counter\n");
    output.push_str(&format!(
        "range_relay_chunks_fetched_total {}\n",
        snapshot.chunks_fetched
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_chunk_fetch_failures_total Number of failed chunk fetches\n");
    output.push_str("# TYPE range_relay_chunk_fetch_failures_total counter\n");
    output.push_str(&format!(
        "range_relay_chunk_fetch_failures_total {}\n",
        snapshot.chunk_fetch_failures
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_chunk_fetch_failure_rate Chunk fetch failure rate percentage\n");
    output.push_str("# TYPE range_relay_chunk_fetch_failure_rate gauge\n");
    output.push_str(&format!(
        "range_relay_chunk_fetch_failure_rate {:.2}\n",
        snapshot.chunk_fetch_failure_rate()
    ));
    output.push_str("\n");

    // Byte metrics
    output.push_str("# HELP range_relay_bytes_streamed_total Bytes delivered to clients\n");
    output.push_str("# TYPE range_relay_bytes_streamed_total counter\n");
    output.push_str(&format!(
        "range_relay_bytes_streamed_total {}\n",
        snapshot.bytes_streamed
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_truncated_streams_total Streams terminated before delivering their full range\n");
    output.push_str("# TYPE range_relay_truncated_streams_total counter\n");
    output.push_str(&format!(
        "range_relay_truncated_streams_total {}\n",
        snapshot.truncated_streams
    ));
    output.push_str("\n");

    // Session metrics
    output.push_str("# HELP range_relay_sessions_created_total Number of sessions established\n");
    output.push_str("# TYPE range_relay_sessions_created_total counter\n");
    output.push_str(&format!(
        "range_relay_sessions_created_total {}\n",
        snapshot.sessions_created
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_imported_sessions_total Number of sessions established via export/import\n");
    output.push_str("# TYPE range_relay_imported_sessions_total counter\n");
    output.push_str(&format!(
        "range_relay_imported_sessions_total {}\n",
        snapshot.imported_sessions
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_session_cache_hits_total Requests served by an already-cached session\n");
    output.push_str("# TYPE range_relay_session_cache_hits_total counter\n");
    output.push_str(&format!(
        "range_relay_session_cache_hits_total {}\n",
        snapshot.session_cache_hits
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_handshake_retries_total Repeated session handshake attempts\n");
    output.push_str("# TYPE range_relay_handshake_retries_total counter\n");
    output.push_str(&format!(
        "range_relay_handshake_retries_total {}\n",
        snapshot.handshake_retries
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_rate_limit_retries_total Control calls retried after a rate limit\n");
    output.push_str("# TYPE range_relay_rate_limit_retries_total counter\n");
    output.push_str(&format!(
        "range_relay_rate_limit_retries_total {}\n",
        snapshot.rate_limit_retries
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_session_reuse_rate Session reuse rate percentage\n");
    output.push_str("# TYPE range_relay_session_reuse_rate gauge\n");
    output.push_str(&format!(
        "range_relay_session_reuse_rate {:.2}\n",
        snapshot.session_reuse_rate()
    ));
    output.push_str("\n");

    // Latency metrics
    output.push_str("# HELP range_relay_avg_request_duration_ms Average request duration in milliseconds\n");
    output.push_str("# TYPE range_relay_avg_request_duration_ms gauge\n");
    output.push_str(&format!(
        "range_relay_avg_request_duration_ms {:.2}\n",
        snapshot.avg_request_duration_ms()
    ));
    output.push_str("\n");

    output.push_str("# HELP range_relay_avg_chunk_fetch_duration_ms Average chunk fetch duration in milliseconds\n");
    output.push_str("# TYPE range_relay_avg_chunk_fetch_duration_ms gauge\n");
    output.push_str(&format!(
        "range_relay_avg_chunk_fetch_duration_ms {:.2}\n",
        snapshot.avg_chunk_fetch_duration_ms()
    ));

    output
}
