//! Range Relay
//!
//! An HTTP byte-range gateway for media objects held in a remote,
//! chunk-oriented, session-authenticated store. Clients ask for ordinary
//! HTTP ranges; the gateway translates them into aligned chunk fetches,
//! trims the edges, and streams the exact requested bytes back while
//! later chunks are still in flight.
//!
//! # Overview
//!
//! The backing store never serves arbitrary byte ranges. It serves fixed
//! chunks, at offsets that are multiples of the chunk size, to sessions
//! authenticated against the region that holds the object. The gateway
//! bridges that model to plain HTTP: it resolves the object, picks a
//! power-of-two chunk size for the request, fetches the aligned chunk
//! grid covering the range, and cuts the first and last chunks down so
//! the client sees exactly the bytes it asked for.
//!
//! # Features
//!
//! - **Range translation**: `Range: bytes=start-end` and open-ended
//!   `bytes=start-` become aligned chunk grids with edge trimming
//! - **Streaming responses**: 206/200 bodies stream chunk by chunk with
//!   one chunk of prefetch, so memory stays flat regardless of file size
//! - **Session reuse**: per-region sessions are established once and
//!   cached; cross-region access uses an export/import handshake with
//!   bounded retries on rejected authorization bytes
//! - **Watch pages**: HTML player pages for known video and audio types,
//!   download landing pages for everything else
//! - **Metrics**: Prometheus text exposition at `/metrics`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use range_relay::{Gateway, RelayConfig, RemoteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = Arc::new(RelayConfig::from_file("range_relay.yaml")?);
//!     let store = Arc::new(RemoteStore::new(&config)?);
//!
//!     let gateway = Arc::new(Gateway::new(config, store));
//!     gateway.start().await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Gateway`]: HTTP front end; routes requests and shapes responses
//! - [`chunk_planner`]: picks the chunk size and the aligned fetch grid
//!   for one byte range
//! - [`SessionRegistry`]: caches one authenticated session per region,
//!   with per-region creation locks so concurrent first requests share a
//!   single handshake
//! - [`ChunkFetcher`]: performs individual aligned chunk fetches under a
//!   timeout
//! - [`StreamProducer`]: walks the chunk grid in order, trims edges, and
//!   feeds the response body channel
//! - [`RemoteStore`]: HTTP client for the store's control API, behind
//!   the [`ChunkStore`] trait so tests can substitute their own store
//! - [`GatewayMetrics`]: runtime counters and their Prometheus rendering
//!
//! # Configuration
//!
//! Configuration is loaded from a YAML file:
//!
//! ```yaml
//! listen_address: "0.0.0.0:8080"
//! store_url: "http://127.0.0.1:9000"
//! auth_token: "change-me"
//! home_region: 1
//! public_url: "http://localhost:8080"
//! fetch_timeout_secs: 30
//! handshake_timeout_secs: 15
//! handshake_max_attempts: 3
//! ```
//!
//! See [`RelayConfig`] for every knob and its default.
//!
//! # Error Handling
//!
//! All fallible operations return [`RelayError`]. At the HTTP boundary
//! errors collapse onto a deliberately small status set: bad requests
//! and unknown objects are both 404, store-side failures are 502,
//! timeouts are 504. Mid-stream failures cannot change the status line
//! anymore; they terminate the body early and are recorded in the
//! metrics instead.

pub mod config;
pub mod models;
pub mod error;
pub mod chunk_planner;
pub mod store;
pub mod retry;
pub mod session_registry;
pub mod chunk_fetcher;
pub mod stream_producer;
pub mod render;
pub mod metrics;
pub mod gateway;

// Re-export commonly used types
pub use config::RelayConfig;
pub use models::{ByteRange, ChunkLocation, ChunkPlan, FileDescriptor, Session, StreamRequest};
pub use error::{RelayError, Result};
pub use store::{ChunkStore, RemoteStore};
pub use retry::RetryPolicy;
pub use session_registry::SessionRegistry;
pub use chunk_fetcher::ChunkFetcher;
pub use stream_producer::{ChunkReceiver, StreamProducer};
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use gateway::{Gateway, GatewayBody};
