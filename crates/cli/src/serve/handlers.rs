//! HTTP route handlers: health, almanac, run count, verification.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use verificat_verify::VerifyError;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /v0/almanac
pub(crate) async fn handle_almanac(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.verifier.store().list()))
}

/// GET /v0/{service}
///
/// Plain-text run count; an unknown service is `404` with a body of `0`.
pub(crate) async fn handle_run_count(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> impl IntoResponse {
    let count = state.verifier.store().run_count(&service);
    let status = if count == 0 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, count.to_string())
}

/// POST /v0/{service}
pub(crate) async fn handle_verify(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> impl IntoResponse {
    match state.verifier.run_verification(&service).await {
        Ok(result) => (StatusCode::ACCEPTED, Json(result)).into_response(),
        Err(VerifyError::Catalog { source, .. }) => {
            let body = serde_json::json!({
                "error": "service unknown or catalog unreachable",
                "service": service,
                "detail": source.to_string(),
            });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(service = %service, error = %e, "verification not recorded");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}
