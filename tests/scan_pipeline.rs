use linksummary::{
    assets::FsAssetImporter,
    config::{StaticConfig, SummarySettings},
    dispatch::FetchDispatcher,
    entities::{ContentItem, ItemId},
    fetcher::{HttpSettings, ReqwestClient},
    handlers::{RegistryBuilder, register_builtin},
    repositories::{FileScanStore, ScanStateStore},
    scan::{ScanController, ScanOutcome, SkipReason},
    scanner::Prober,
    summary::SummaryRenderer,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png-body";
const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg-body";

struct Pipeline {
    controller: Arc<ScanController>,
    renderer: SummaryRenderer,
    store: Arc<FileScanStore>,
    media: TempDir,
    _state: TempDir,
}

async fn pipeline() -> Pipeline {
    let state = TempDir::new().unwrap();
    let media = TempDir::new().unwrap();

    let settings = SummarySettings {
        mime_types: ["image/png", "text/html"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..SummarySettings::default()
    };
    let config = Arc::new(StaticConfig::new(settings));

    let client = Arc::new(ReqwestClient::new(&HttpSettings::with_timeout(Duration::from_secs(5))).unwrap());
    let importer = Arc::new(FsAssetImporter::new(client.clone(), media.path(), "/media"));
    let mut builder = RegistryBuilder::new();
    register_builtin(&mut builder, client.clone(), importer).unwrap();
    let registry = Arc::new(builder.build());

    let store = Arc::new(FileScanStore::open(state.path()).await.unwrap());
    let controller = ScanController::new(
        Url::parse("https://www.example.com").unwrap(),
        config.clone(),
        store.clone(),
        Prober::new(client, 4),
        FetchDispatcher::new(registry.clone()),
    );
    let renderer = SummaryRenderer::new(registry, config, store.clone());

    Pipeline {
        controller: Arc::new(controller),
        renderer,
        store,
        media,
        _state: state,
    }
}

async fn mount_head(server: &MockServer, route: &str, status: u16, content_type: &str) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).insert_header("Content-Type", content_type))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, route: &str, status: u16, content_type: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("Content-Type", content_type)
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

async fn mount_remote_site(server: &MockServer) {
    mount_head(server, "/photo.png", 200, "image/png").await;
    mount_get(server, "/photo.png", 200, "image/png", PNG_BYTES.to_vec()).await;

    mount_head(server, "/broken.png", 200, "image/png").await;
    mount_get(server, "/broken.png", 500, "text/plain", b"boom".to_vec()).await;

    mount_head(server, "/article", 200, "text/html; charset=utf-8").await;
    let article = format!(
        r#"<html><head>
            <title>Remote Article</title>
            <meta property="og:description" content="A story worth reading">
            <meta property="og:image" content="{}/cover.jpg">
        </head><body>text</body></html>"#,
        server.uri()
    );
    mount_get(server, "/article", 200, "text/html; charset=utf-8", article.into_bytes()).await;
    mount_get(server, "/cover.jpg", 200, "image/jpeg", JPEG_BYTES.to_vec()).await;

    mount_head(server, "/missing", 404, "text/html").await;
}

fn body_for(server: &MockServer) -> String {
    let base = server.uri();
    format!(
        "Look at {base}/photo.png and {base}/broken.png, read {base}/article \
         but not {base}/missing or https://www.example.com/local-page."
    )
}

#[tokio::test]
async fn test_scan_buckets_fetches_and_renders() {
    let server = MockServer::start().await;
    mount_remote_site(&server).await;
    let pipeline = pipeline().await;
    let item = ContentItem::published_entry("101", "post", body_for(&server));

    let outcome = pipeline.controller.on_content_finalized(&item).await.unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Scanned {
            eligible_urls: 4,
            discovered_types: vec!["image/png".to_string(), "text/html".to_string()],
            fetched_types: vec!["image/png".to_string(), "text/html".to_string()],
        }
    );

    let state = pipeline.store.get(&item.id).await.unwrap();
    assert!(state.scanned);

    let base = server.uri();
    let discovered = state.discovered_urls.unwrap();
    assert_eq!(
        discovered["image/png"],
        vec![format!("{base}/photo.png"), format!("{base}/broken.png")]
    );
    assert_eq!(discovered["text/html"], vec![format!("{base}/article")]);

    let fetched = state.fetched_data.unwrap();
    let images = fetched["image/png"].as_array().unwrap();
    assert_eq!(images.len(), 1, "the failing image is dropped, the rest kept");
    assert_eq!(images[0]["source_url"], format!("{base}/photo.png"));

    let pages = fetched["text/html"].as_array().unwrap();
    assert_eq!(pages[0]["title"], "Remote Article");
    assert_eq!(pages[0]["description"], "A story worth reading");
    assert!(pages[0]["image"]["asset"]["url"].as_str().unwrap().starts_with("/media/101/"));

    let png_digest = format!("{:x}", md5::compute(PNG_BYTES));
    assert!(pipeline.media.path().join("101").join(format!("{png_digest}.png")).exists());

    let summary = pipeline.renderer.render_item(&item.id).await;
    assert!(summary.starts_with(r#"<div class="lsum-summary">"#));
    let images_at = summary.find("lsum-images").unwrap();
    let html_at = summary.find("lsum-html-row").unwrap();
    assert!(images_at < html_at, "registry order puts images first");
    assert!(summary.contains("Remote Article"));
}

#[tokio::test]
async fn test_second_event_makes_no_network_calls() {
    let server = MockServer::start().await;
    mount_remote_site(&server).await;
    let pipeline = pipeline().await;
    let item = ContentItem::published_entry("102", "post", body_for(&server));

    pipeline.controller.on_content_finalized(&item).await.unwrap();
    let state = pipeline.store.get(&item.id).await.unwrap();
    let requests = server.received_requests().await.unwrap().len();

    let outcome = pipeline.controller.on_content_finalized(&item).await.unwrap();

    assert_eq!(
        outcome,
        ScanOutcome::Skipped {
            reason: SkipReason::AlreadyScanned
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), requests);
    assert_eq!(pipeline.store.get(&item.id).await.unwrap(), state);
}

#[tokio::test]
async fn test_concurrent_events_scan_once() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/slow.png", 200, "image/png", PNG_BYTES.to_vec()).await;

    let pipeline = pipeline().await;
    let item = ContentItem::published_entry("103", "post", format!("{}/slow.png", server.uri()));

    let (first, second) = tokio::join!(
        pipeline.controller.on_content_finalized(&item),
        pipeline.controller.on_content_finalized(&item),
    );
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.retain(|outcome| matches!(outcome, ScanOutcome::Scanned { .. }));

    assert_eq!(outcomes.len(), 1, "exactly one trigger performs the scan");
    let gets = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 1);
}

#[tokio::test]
async fn test_rescan_refreshes_cached_result() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/photo.png"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/png"))
        .expect(2)
        .mount(&server)
        .await;
    mount_get(&server, "/photo.png", 200, "image/png", PNG_BYTES.to_vec()).await;

    let pipeline = pipeline().await;
    let item = ContentItem::published_entry("104", "post", format!("{}/photo.png", server.uri()));

    pipeline.controller.on_content_finalized(&item).await.unwrap();
    let outcome = pipeline.controller.rescan(&item).await.unwrap();

    assert!(matches!(outcome, ScanOutcome::Scanned { eligible_urls: 1, .. }));
    assert!(pipeline.store.get(&ItemId::new("104")).await.unwrap().scanned);
}
