use crate::infra::{AppState, PrescoredPortfolio};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use loan_recovery::portfolio::portfolio_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_operational_routes(service: Arc<PrescoredPortfolio>) -> axum::Router {
    portfolio_router(service)
        .route("/health", get(healthcheck))
        .route("/api/health", get(api_healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn api_healthcheck() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "message": "Loan recovery portfolio service is running",
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
