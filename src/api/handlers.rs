use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, warn};

use crate::api::AppState;
use crate::api::dtos::{AcceptedResponse, ErrorResponse, FinalizedRequest};
use crate::entities::{ItemId, ScanState};
use crate::scan::{ScanError, ScanOutcome};

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/items/{id}/finalized",
    tag = "items",
    params(("id" = String, Path, description = "Content item id")),
    request_body = FinalizedRequest,
    responses(
        (status = 202, description = "Queued for scanning", body = AcceptedResponse),
        (status = 503, description = "Scan queue closed", body = ErrorResponse)
    )
)]
pub async fn content_finalized(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(payload): Json<FinalizedRequest>,
) -> Response {
    let item = payload.into_item(id.clone());
    match state.queue.enqueue(item).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(AcceptedResponse { id })).into_response(),
        Err(e) => {
            warn!(item = %id, error = %e, "rejecting lifecycle event");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/items/{id}/rescan",
    tag = "items",
    params(("id" = String, Path, description = "Content item id")),
    request_body = FinalizedRequest,
    responses(
        (status = 200, description = "Scan outcome", body = ScanOutcome),
        (status = 500, description = "State store failure", body = ErrorResponse),
        (status = 504, description = "Scan deadline exceeded", body = ErrorResponse)
    )
)]
pub async fn rescan(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(payload): Json<FinalizedRequest>,
) -> Response {
    let item = payload.into_item(id);
    match state.controller.rescan(&item).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(ScanError::TimedOut(limit)) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            format!("scan did not finish within {}s", limit.as_secs()),
        ),
        Err(ScanError::Store(e)) => {
            error!(item = %item.id, error = %e, "rescan failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "State store error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/items/{id}/state",
    tag = "items",
    params(("id" = String, Path, description = "Content item id")),
    responses(
        (status = 200, description = "Persisted scan state", body = ScanState),
        (status = 500, description = "State store failure", body = ErrorResponse)
    )
)]
pub async fn get_state(State(state): State<AppState>, Path(id): Path<ItemId>) -> Response {
    match state.store.get(&id).await {
        Ok(scan_state) => Json(scan_state).into_response(),
        Err(e) => {
            error!(item = %id, error = %e, "failed to read scan state");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "State store error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/items/{id}/summary",
    tag = "items",
    params(("id" = String, Path, description = "Content item id")),
    responses(
        (status = 200, description = "Rendered summary fragment", body = String, content_type = "text/html")
    )
)]
pub async fn get_summary(State(state): State<AppState>, Path(id): Path<ItemId>) -> Html<String> {
    Html(state.renderer.render_item(&id).await)
}
