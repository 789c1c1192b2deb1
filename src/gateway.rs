//! HTTP gateway: the outward-facing byte-range adapter
//!
//! Routes:
//! - `GET /` - liveness text
//! - `GET /metrics` - Prometheus text exposition
//! - `GET /watch/{id}/{name}` - HTML player or download landing page
//! - `GET /download/{id}/{name}` - media bytes
//! - `GET /{id}/{name}` - media bytes (short form used by player pages)
//!
//! Media responses answer `Range: bytes=start-end` and `bytes=start-`
//! with 206 Partial Content and stream their body straight off the
//! producer's channel, so the first chunk reaches the client while later
//! chunks are still being fetched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use crate::chunk_fetcher::ChunkFetcher;
use crate::chunk_planner;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::metrics::{render_prometheus, GatewayMetrics};
use crate::models::{ByteRange, FileDescriptor, StreamRequest};
use crate::render;
use crate::retry::RetryPolicy;
use crate::session_registry::SessionRegistry;
use crate::store::ChunkStore;
use crate::stream_producer::{ChunkReceiver, StreamProducer};

/// Body type shared by every response: fixed pages ride a [`Full`],
/// media rides the producer's channel wrapped as a [`StreamBody`]
pub type GatewayBody = BoxBody<Bytes, RelayError>;

/// Text served at the root route
const LIVENESS_TEXT: &str = "range-relay gateway is running";

fn full_body<T: Into<Bytes>>(data: T) -> GatewayBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn stream_body(rx: ChunkReceiver) -> GatewayBody {
    let frames = ReceiverStream::new(rx).map(|item| item.map(Frame::data));
    StreamBody::new(frames).boxed()
}

/// The gateway itself: resolves objects, plans chunk grids, and serves
/// byte ranges out of the backing store
///
/// One instance is shared across all connections behind an [`Arc`]; all
/// internal components hang off the same metrics collector.
pub struct Gateway {
    config: Arc<RelayConfig>,
    store: Arc<dyn ChunkStore>,
    producer: StreamProducer,
    control_policy: RetryPolicy,
    metrics: Arc<GatewayMetrics>,
}

impl Gateway {
    /// Create a new Gateway over `store`
    ///
    /// Builds the session registry, chunk fetcher, and stream producer
    /// internally from the configuration's timeout and retry budgets.
    pub fn new(config: Arc<RelayConfig>, store: Arc<dyn ChunkStore>) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());

        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&store),
            RetryPolicy::new(config.handshake_max_attempts, 0),
            config.handshake_timeout(),
            Arc::clone(&metrics),
        ));
        let fetcher = ChunkFetcher::new(
            Arc::clone(&store),
            config.fetch_timeout(),
            Arc::clone(&metrics),
        );
        let producer = StreamProducer::new(registry, fetcher, Arc::clone(&metrics));

        // Control-path calls honor backend rate limits: the advertised
        // Retry-After wins over the base backoff, capped by config.
        let control_policy = RetryPolicy::new(config.rate_limit_max_retries + 1, 500)
            .with_max_delay(config.max_rate_limit_wait());

        Gateway {
            config,
            store,
            producer,
            control_policy,
            metrics,
        }
    }

    /// Get a reference to the gateway configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get a reference to the metrics collector
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Bind the configured listen address and serve until failure
    pub async fn start(
        self: Arc<Self>,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.listen_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener
    ///
    /// Each connection runs in its own task; requests inside it are
    /// handled sequentially by HTTP/1.1 keep-alive.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Gateway listening on http://{}", listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let gateway = Arc::clone(&self);

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let gateway = Arc::clone(&gateway);
                    async move { gateway.handle_request(req).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    // Covers clients that drop mid-stream, so keep it quiet
                    debug!("Connection from {} ended with error: {:?}", peer, e);
                }
            });
        }
    }

    /// Handle one HTTP request
    ///
    /// Never fails at the hyper level: routing and downstream errors are
    /// rendered as plain-text status responses instead.
    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> std::result::Result<Response<GatewayBody>, hyper::Error> {
        let started = Instant::now();
        self.metrics.record_http_request();

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match self.route(&req).await {
            Ok(response) => response,
            Err(e) => self.error_response(&e),
        };

        self.metrics.record_request_duration(started.elapsed());
        debug!("{} {} -> {}", method, path, response.status());
        Ok(response)
    }

    async fn route(&self, req: &Request<Incoming>) -> Result<Response<GatewayBody>> {
        if req.method() != Method::GET {
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, "GET")
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(full_body("405 Method Not Allowed"))?);
        }

        let path = req.uri().path();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Ok(liveness_response()),
            ["metrics"] => Ok(self.metrics_response()),
            ["watch", raw_id, _] => self.watch_page(raw_id).await,
            ["download", raw_id, _] => self.stream_media(raw_id, req.headers()).await,
            [raw_id, _] => self.stream_media(raw_id, req.headers()).await,
            _ => Err(RelayError::not_found(format!("no route for {}", path))),
        }
    }

    /// Serve the HTML watch page for one object
    async fn watch_page(&self, raw_id: &str) -> Result<Response<GatewayBody>> {
        let object_id = parse_object_id(raw_id)?;
        let descriptor = self.resolve_descriptor(object_id).await?;
        let html = render::watch_page(&descriptor, object_id, &self.config.public_url);

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(full_body(html))?)
    }

    /// Stream object bytes, honoring a `Range` header when present
    async fn stream_media(
        &self,
        raw_id: &str,
        headers: &HeaderMap,
    ) -> Result<Response<GatewayBody>> {
        let object_id = parse_object_id(raw_id)?;
        let descriptor = self.resolve_descriptor(object_id).await?;

        let (range, ranged) = match headers.get(header::RANGE) {
            Some(value) => {
                let value = value.to_str().map_err(|_| {
                    RelayError::bad_request("Range header is not valid ASCII")
                })?;
                (ByteRange::from_header(value, descriptor.size)?, true)
            }
            None => (ByteRange::full(descriptor.size)?, false),
        };
        self.metrics.record_media_request(ranged);
        let request = StreamRequest::new(object_id, range, ranged);

        let name = render::display_name(&descriptor, object_id);
        let mime = render::resolve_mime(&descriptor, &name);

        let plan = chunk_planner::plan(
            descriptor.size,
            range.start,
            range.end,
            mime.starts_with("video/"),
        )?;
        info!(
            "Streaming object {}: bytes {}-{}/{} in {} parts of {} bytes",
            object_id, range.start, range.end, descriptor.size, plan.part_count, plan.chunk_size
        );

        let rx = self.producer.produce(&descriptor, plan).await?;

        let (status, headers) = media_response_parts(&request, &descriptor, &name, &mime)?;
        let mut response = Response::new(stream_body(rx));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Resolve an object's descriptor, honoring backend rate limits
    async fn resolve_descriptor(&self, object_id: i64) -> Result<FileDescriptor> {
        let attempts = AtomicU64::new(0);
        self.control_policy
            .run("object resolution", || {
                if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                    self.metrics.record_rate_limit_retry();
                }
                let store = Arc::clone(&self.store);
                async move { store.resolve(object_id).await }
            })
            .await
    }

    fn metrics_response(&self) -> Response<GatewayBody> {
        let body = render_prometheus(&self.metrics.get_stats());
        Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )
            .body(full_body(body))
            .unwrap()
    }

    fn error_response(&self, error: &RelayError) -> Response<GatewayBody> {
        self.metrics.record_failure();
        let status = StatusCode::from_u16(error.to_http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed with {}: {}", status.as_u16(), error);
        } else {
            debug!("Request rejected with {}: {}", status.as_u16(), error);
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(full_body(format!("{} {}", status.as_u16(), reason)))
            .unwrap()
    }
}

fn liveness_response() -> Response<GatewayBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(full_body(LIVENESS_TEXT))
        .unwrap()
}

/// Parse the numeric object id out of a path segment
fn parse_object_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|_| {
        RelayError::bad_request(format!("object id must be numeric, got '{}'", raw))
    })
}

/// Build the status and headers for one media response
///
/// Ranged requests get 206 with `Content-Range` and a `Content-Length`
/// covering just the requested bytes; full requests get 200 with the
/// whole object's length. Video additionally carries the cache hints
/// browser players rely on for smooth seeking.
fn media_response_parts(
    request: &StreamRequest,
    descriptor: &FileDescriptor,
    display_name: &str,
    mime: &str,
) -> Result<(StatusCode, HeaderMap)> {
    let status = if request.ranged {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime)
            .map_err(|e| RelayError::InternalError(format!("invalid content type: {}", e)))?,
    );

    let disposition = format!("attachment; filename=\"{}\"", ascii_filename(display_name));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| {
            RelayError::InternalError(format!("invalid content disposition: {}", e))
        })?,
    );

    if request.ranged {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(request.range.size()));
        headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&request.range.content_range_header(descriptor.size))
                .map_err(|e| {
                    RelayError::InternalError(format!("invalid content range: {}", e))
                })?,
        );
    } else {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(descriptor.size));
    }

    if mime.starts_with("video/") {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
    }

    Ok((status, headers))
}

/// Restrict a file name to characters a quoted Content-Disposition value
/// can carry
fn ascii_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
