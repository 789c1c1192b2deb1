//! Tests for the /watch/{id}/{name} HTML pages
//!
//! The watch route resolves the object's descriptor and renders either
//! an inline player or a download landing page, with media links
//! pointing at the configured public URL rather than the listener.

use std::sync::Arc;

use range_relay::{Gateway, RelayConfig, RemoteStore};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A gateway under test plus the handles the assertions need
struct TestGateway {
    base_url: String,
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
        client: reqwest::Client::new(),
    }
}

/// Mount the descriptor for one object
async fn mount_object(
    store: &MockServer,
    object_id: i64,
    size: u64,
    mime: Option<&str>,
    name: Option<&str>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/objects/{}", object_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "region_id": 1,
            "location": { "media_id": 900, "access_token": 9001, "thumb_size": null },
            "size": size,
            "mime_type": mime,
            "file_name": name,
        })))
        .mount(store)
        .await;
}

#[tokio::test]
async fn test_watch_page_video_player() {
    let store = MockServer::start().await;
    mount_object(&store, 23, 4_000_000, Some("video/mp4"), Some("clip.mp4")).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/watch/23/clip.mp4"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("Watch clip.mp4"));
    assert!(body.contains("<video controls"));
    // Media links point at the configured public URL, not the listener
    assert!(body.contains("http://media.test/23/clip.mp4"));
}

#[tokio::test]
async fn test_watch_page_audio_player() {
    let store = MockServer::start().await;
    mount_object(&store, 25, 9_000_000, Some("audio/mpeg"), Some("song.mp3")).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/watch/25/song.mp3"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Listen song.mp3"));
    assert!(body.contains("<audio controls"));
    assert!(body.contains("http://media.test/25/song.mp3"));
}

#[tokio::test]
async fn test_watch_page_download_fallback() {
    let store = MockServer::start().await;
    mount_object(&store, 24, 2_500_000, Some("application/pdf"), Some("paper.pdf")).await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/watch/24/paper.pdf"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Download paper.pdf"));
    assert!(body.contains("2.38 MB"));
    assert!(!body.contains("<video"));
}

#[tokio::test]
async fn test_watch_page_unknown_object() {
    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&store)
        .await;

    let gw = start_gateway(&store.uri()).await;
    let resp = gw
        .client
        .get(gw.url("/watch/99/gone.mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
