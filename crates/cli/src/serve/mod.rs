//! `verificat serve` -- HTTP JSON API for owner readiness verification.
//!
//! Endpoints:
//! - GET  /health        - Server status
//! - GET  /v0/almanac    - All services, most-verified first
//! - GET  /v0/{service}  - Run count for a service (404 with `0` if unknown)
//! - POST /v0/{service}  - Run a verification and record its score
//!
//! JSON responses use Content-Type: application/json.

mod handlers;
mod state;

use std::fs::File;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use verificat_almanac::AlmanacStore;
use verificat_verify::{Verifier, VerifierConfig};

use self::handlers::{
    handle_almanac, handle_health, handle_not_found, handle_run_count, handle_verify,
};
use self::state::AppState;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the router over a verifier.
pub(crate) fn router(verifier: Verifier<File>) -> Router {
    let state = Arc::new(AppState { verifier });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/v0/almanac", get(handle_almanac))
        .route("/v0/{service}", get(handle_run_count).post(handle_verify))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given port.
pub async fn start_server(
    port: u16,
    config: VerifierConfig,
    store: Arc<AlmanacStore<File>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = store.list().len();
    let app = router(Verifier::from_config(&config, store));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        app = "verificat",
        version = env!("CARGO_PKG_VERSION"),
        port,
        catalog = %config.catalog_url,
        services,
        "starting verificat: production readiness verification"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
