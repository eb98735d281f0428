//! HTTP surface: lifecycle intake, explicit re-scan, state and summary reads.

pub mod dtos;
pub mod handlers;
pub mod health;
pub mod state;

pub use state::AppState;

use axum::{
    Json, Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::OpenApi;

use crate::entities::{ContentKind, ItemStatus, ScanState};
use crate::scan::{ScanOutcome, SkipReason};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        handlers::content_finalized,
        handlers::rescan,
        handlers::get_state,
        handlers::get_summary,
    ),
    components(schemas(
        dtos::FinalizedRequest,
        dtos::AcceptedResponse,
        dtos::ErrorResponse,
        health::HealthResponse,
        ContentKind,
        ItemStatus,
        ScanState,
        ScanOutcome,
        SkipReason,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "items", description = "Content item scanning and summaries")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/v1/items/{id}/finalized", post(handlers::content_finalized))
        .route("/v1/items/{id}/rescan", post(handlers::rescan))
        .route("/v1/items/{id}/state", get(handlers::get_state))
        .route("/v1/items/{id}/summary", get(handlers::get_summary))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or("-");
                        info_span!(
                            "http",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StaticConfig, SummarySettings};
    use crate::dispatch::FetchDispatcher;
    use crate::entities::{FetchedData, ItemId};
    use crate::fetcher::{FetchError, MockHttpClient};
    use crate::handlers::RegistryBuilder;
    use crate::repositories::{MemoryScanStore, ScanStateStore};
    use crate::scan::ScanController;
    use crate::scanner::Prober;
    use crate::summary::SummaryRenderer;
    use crate::worker::ScanQueue;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;
    use url::Url;

    struct TestApp {
        router: Router,
        store: Arc<MemoryScanStore>,
        receiver: mpsc::Receiver<crate::entities::ContentItem>,
    }

    fn test_app() -> TestApp {
        let mut client = MockHttpClient::new();
        client
            .expect_head()
            .returning(|_| Err(FetchError::ConnectTimeout));
        let registry = Arc::new(RegistryBuilder::new().build());
        let config = Arc::new(StaticConfig::new(SummarySettings::default()));
        let store = Arc::new(MemoryScanStore::new());
        let controller = ScanController::new(
            Url::parse("https://www.example.com").unwrap(),
            config.clone(),
            store.clone(),
            Prober::new(Arc::new(client), 2),
            FetchDispatcher::new(registry.clone()),
        );
        let renderer = SummaryRenderer::new(registry.clone(), config, store.clone());
        let (queue, receiver) = ScanQueue::bounded(4);

        let state = AppState {
            registry,
            store: store.clone(),
            controller: Arc::new(controller),
            renderer: Arc::new(renderer),
            queue,
        };
        TestApp {
            router: router(state),
            store,
            receiver,
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn event() -> Value {
        json!({
            "kind": {"type": "entry", "post_type": "post"},
            "status": "published",
            "body": "see http://remote.org/page"
        })
    }

    #[tokio::test]
    async fn test_healthz_sets_request_id() {
        let app = test_app();
        let response = app.router.oneshot(get("/healthz")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["status"], "OK");
    }

    #[tokio::test]
    async fn test_finalized_event_is_queued() {
        let mut app = test_app();
        let response = app
            .router
            .oneshot(post_json("/v1/items/12/finalized", event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let queued = app.receiver.recv().await.unwrap();
        assert_eq!(queued.id, ItemId::new("12"));
    }

    #[tokio::test]
    async fn test_finalized_event_with_closed_queue_is_unavailable() {
        let app = test_app();
        drop(app.receiver);
        let response = app
            .router
            .oneshot(post_json("/v1/items/12/finalized", event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_rescan_returns_outcome_and_persists_state() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(post_json("/v1/items/5/rescan", event()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["outcome"], "scanned");
        assert_eq!(outcome["eligible_urls"], 1);

        let response = app.router.oneshot(get("/v1/items/5/state")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"scanned": true, "discovered_urls": {}})
        );
    }

    #[tokio::test]
    async fn test_summary_is_html() {
        let app = test_app();
        let mut fetched = FetchedData::new();
        fetched.insert("image/png".to_string(), json!(["ignored without handler"]));
        app.store
            .put(
                &ItemId::new("9"),
                &ScanState {
                    scanned: true,
                    discovered_urls: None,
                    fetched_data: Some(fetched),
                },
            )
            .await
            .unwrap();

        let response = app.router.oneshot(get("/v1/items/9/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"<div class="lsum-summary"></div>"#);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let app = test_app();
        let response = app
            .router
            .oneshot(get("/api-docs/openapi.json"))
            .await
            .unwrap();

        let doc = body_json(response).await;
        assert!(doc["paths"]["/v1/items/{id}/rescan"].is_object());
        assert!(doc["paths"]["/healthz"].is_object());
    }
}
