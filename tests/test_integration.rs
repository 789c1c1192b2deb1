//! End-to-end streaming tests against a mocked chunk store
//!
//! A real gateway listens on an ephemeral port; wiremock stands in for
//! the store's control API. Requests are driven with reqwest and
//! asserted on status, headers, and exact body bytes, so these tests
//! cover the whole path: route handling, range translation down to
//! aligned chunk fetches, trimming, and response assembly.

use std::sync::Arc;

use range_relay::{Gateway, RelayConfig, RemoteStore};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MIB: u64 = 1024 * 1024;

/// A gateway under test plus the handles the assertions need
struct TestGateway {
    base_url: String,
    gateway: Arc<Gateway>,
    client: reqwest::Client,
}

impl TestGateway {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start a gateway on an ephemeral port, wired to `store_url`
async fn start_gateway(store_url: &str) -> TestGateway {
    let config = Arc::new(RelayConfig {
        store_url: store_url.to_string(),
        auth_token: "test-token".to_string(),
        public_url: "http://media.test".to_string(),
        ..Default::default()
    });
    let store = Arc::new(RemoteStore::new(&config).unwrap());
    let gateway = Arc::new(Gateway::new(config, store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(Arc::clone(&gateway).serve(listener));

    TestGateway {
        base_url,
        gateway,
        client: reqwest::Client::new(),
    }
}

/// Deterministic byte pattern so a mismatch shows up anywhere in the
/// object, not just at chunk edges
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Mount the descriptor for one object
async fn mount_object(
    store: &MockServer,
    object_id: i64,
    region: u8,
    media_id: i64,
    size: u64,
    mime: Option<&str>,
    name: Option<&str>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/objects/{}", object_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "region_id": region,
            "location": { "media_id": media_id, "access_token": 9001, "thumb_size": null },
            "size": size,
            "mime_type": mime,
            "file_name": name,
        })))
        .mount(store)
        .await;
}

/// Mount a successful home-region session handshake
async fn mount_home_session(store: &MockServer, region: u8) {
    Mock::given(method("POST"))
        .and(path(format!("/regions/{}/sessions", region)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "region_id": region,
            "auth_key": format!("home-key-{}", region),
            "imported": false,
        })))
        .mount(store)
        .await;
}

/// Mount chunk responses over `data` for every aligned offset, plus an
/// empty end-of-object response for the first offset past the data
async fn mount_chunks(store: &MockServer, region: u8, media_id: i64, data: &[u8], chunk_size: u64) {
    let chunk_path = format!("/regions/{}/objects/{}/chunk", region, media_id);
    let mut offset = 0u64;

    while offset < data.len() as u64 {
        let end = (offset + chunk_size).min(data.len() as u64);
        Mock::given(method("GET"))
            .and(path(chunk_path.as_str()))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", chunk_size.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(data[offset as usize..end as usize].to_vec()),
            )
            .mount(store)
            .await;
        offset += chunk_size;
    }

    Mock::given(method("GET"))
        .and(path(chunk_path.as_str()))
        .and(query_param("offset", offset.to_string()))
        .and(query_param("limit", chunk_size.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
        .mount(store)
        .await;
}

#[tokio::test]
async fn test_full_object_download() {
    let store = MockServer::start().await;
    let data = patterned(100_000);
    mount_object(&store, 42, 1, 555, 100_000, Some("application/pdf"), Some("paper.pdf")).await;
    mount_home_session(&store, 1).await;
    // 100 KB request length rounds up to 128 KiB chunks
    mount_chunks(&store, 1, 555, &data, 128 * 1024).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/42/paper.pdf"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers.get(reqwest::header::ACCEPT_RANGES).unwrap(), "bytes");
    assert_eq!(headers.get(reqwest::header::CONTENT_TYPE).unwrap(), "application/pdf");
    assert_eq!(headers.get(reqwest::header::CONTENT_LENGTH).unwrap(), "100000");
    assert_eq!(
        headers.get(reqwest::header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"paper.pdf\""
    );
    assert!(headers.get(reqwest::header::CONTENT_RANGE).is_none());

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..]);
}

#[tokio::test]
async fn test_ranged_request_mid_object() {
    let store = MockServer::start().await;
    let data = patterned(3_000_000);
    mount_object(&store, 7, 1, 600, 3_000_000, Some("application/zip"), Some("big.zip")).await;
    mount_home_session(&store, 1).await;
    // A 1 MB request length lands on 1 MiB chunks
    mount_chunks(&store, 1, 600, &data, MIB).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/7/big.zip"))
        .header(reqwest::header::RANGE, "bytes=1000000-1999999")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_LENGTH).unwrap(),
        "1000000"
    );
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_RANGE).unwrap(),
        "bytes 1000000-1999999/3000000"
    );

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), 1_000_000);
    assert_eq!(&body[..], &data[1_000_000..2_000_000]);

    // The range touches exactly two 1 MiB grid cells
    let stats = gw.gateway.metrics().get_stats();
    assert_eq!(stats.chunks_fetched, 2);
    assert_eq!(stats.ranged_requests, 1);
    assert_eq!(stats.bytes_streamed, 1_000_000);
}

#[tokio::test]
async fn test_open_ended_range() {
    let store = MockServer::start().await;
    let data = patterned(100);
    mount_object(&store, 9, 1, 601, 100, Some("text/plain"), Some("notes.txt")).await;
    mount_home_session(&store, 1).await;
    mount_chunks(&store, 1, 601, &data, 4096).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/9/notes.txt"))
        .header(reqwest::header::RANGE, "bytes=5-")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_RANGE).unwrap(),
        "bytes 5-99/100"
    );
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_LENGTH).unwrap(),
        "95"
    );

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[5..]);
}

#[tokio::test]
async fn test_range_end_clamped_to_object_size() {
    let store = MockServer::start().await;
    let data = patterned(100);
    mount_object(&store, 9, 1, 601, 100, Some("text/plain"), Some("notes.txt")).await;
    mount_home_session(&store, 1).await;
    mount_chunks(&store, 1, 601, &data, 4096).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/9/notes.txt"))
        .header(reqwest::header::RANGE, "bytes=10-999999")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_RANGE).unwrap(),
        "bytes 10-99/100"
    );
    assert_eq!(resp.bytes().await.unwrap().len(), 90);
}

#[tokio::test]
async fn test_video_gets_cache_hints() {
    let store = MockServer::start().await;
    let data = patterned(200_000);
    mount_object(&store, 11, 1, 602, 200_000, Some("video/mp4"), Some("clip.mp4")).await;
    mount_home_session(&store, 1).await;
    mount_chunks(&store, 1, 602, &data, 256 * 1024).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw.client.get(gw.url("/11/clip.mp4")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get(reqwest::header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(&resp.bytes().await.unwrap()[..], &data[..]);
}

#[tokio::test]
async fn test_download_and_bare_routes_serve_same_bytes() {
    let store = MockServer::start().await;
    let data = patterned(5_000);
    mount_object(&store, 13, 1, 603, 5_000, Some("application/json"), Some("data.json")).await;
    mount_home_session(&store, 1).await;
    mount_chunks(&store, 1, 603, &data, 8192).await;

    let gw = start_gateway(&store.uri()).await;

    let bare = gw
        .client
        .get(gw.url("/13/data.json"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let download = gw
        .client
        .get(gw.url("/download/13/data.json"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(&bare[..], &data[..]);
    assert_eq!(&download[..], &data[..]);
}

#[tokio::test]
async fn test_missing_name_falls_back_to_synthesized() {
    let store = MockServer::start().await;
    let data = patterned(1_000);
    mount_object(&store, 21, 1, 604, 1_000, None, None).await;
    mount_home_session(&store, 1).await;
    mount_chunks(&store, 1, 604, &data, 4096).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw.client.get(gw.url("/21/anything")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"file-21.bin\""
    );
}

#[tokio::test]
async fn test_chunk_failure_truncates_stream_after_headers() {
    let store = MockServer::start().await;
    let data = patterned(3_000_000);
    mount_object(&store, 30, 1, 605, 3_000_000, Some("application/zip"), Some("big.zip")).await;
    mount_home_session(&store, 1).await;

    let chunk_path = "/regions/1/objects/605/chunk";
    // First grid cell succeeds, the second one blows up
    Mock::given(method("GET"))
        .and(path(chunk_path))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(data[..MIB as usize].to_vec()))
        .mount(&store)
        .await;
    Mock::given(method("GET"))
        .and(path(chunk_path))
        .and(query_param("offset", MIB.to_string()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&store)
        .await;

    let gw = start_gateway(&store.uri()).await;
    let mut resp = gw.client.get(gw.url("/30/big.zip")).send().await.unwrap();

    // Headers were already committed before the failure
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get(reqwest::header::CONTENT_LENGTH).unwrap(),
        "3000000"
    );

    let mut received = Vec::new();
    let mut body_failed = false;
    loop {
        match resp.chunk().await {
            Ok(Some(part)) => received.extend_from_slice(&part),
            Ok(None) => break,
            Err(_) => {
                body_failed = true;
                break;
            }
        }
    }

    assert!(body_failed, "the body should terminate before completion");
    assert!(received.len() < 3_000_000);
    assert_eq!(&received[..], &data[..received.len()]);
    assert_eq!(gw.gateway.metrics().get_stats().truncated_streams, 1);
}
