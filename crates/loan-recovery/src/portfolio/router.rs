use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde_json::json;

use super::filter::BatchQuery;
use super::service::{
    BatchScorer, BatchUpload, PortfolioService, PortfolioServiceError, ScoringError, UploadFormat,
};
use super::views::{FilteredResultsView, UploadView};

/// Router exposing batch upload and the dashboard read endpoints.
pub fn portfolio_router<S>(service: Arc<PortfolioService<S>>) -> Router
where
    S: BatchScorer + 'static,
{
    Router::new()
        .route("/api/upload", post(upload_handler::<S>))
        .route("/api/summary", get(summary_handler::<S>))
        .route("/api/results", get(results_handler::<S>))
        .route("/api/segments", get(segments_handler::<S>))
        .route("/api/status", get(status_handler::<S>))
        .route("/api/batch", delete(clear_handler::<S>))
        .with_state(service)
}

pub(crate) async fn upload_handler<S>(
    State(service): State<Arc<PortfolioService<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: BatchScorer + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let Some(format) = UploadFormat::from_content_type(content_type) else {
        return rejected_upload(&service, "Invalid file type. Please upload a CSV file.");
    };

    if body.is_empty() {
        return rejected_upload(&service, "No file provided");
    }

    let upload = BatchUpload {
        format,
        body: body.to_vec(),
    };

    match service.upload(upload) {
        Ok(batch) => (StatusCode::OK, axum::Json(UploadView::new(batch.view()))).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn summary_handler<S>(State(service): State<Arc<PortfolioService<S>>>) -> Response
where
    S: BatchScorer + 'static,
{
    match service.current() {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.view())).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn results_handler<S>(
    State(service): State<Arc<PortfolioService<S>>>,
    Query(query): Query<BatchQuery>,
) -> Response
where
    S: BatchScorer + 'static,
{
    match service.current() {
        Ok(batch) => {
            let view = FilteredResultsView::new(&query, batch.filter(&query));
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn segments_handler<S>(
    State(service): State<Arc<PortfolioService<S>>>,
) -> Response
where
    S: BatchScorer + 'static,
{
    match service.current() {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.segmentation())).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn status_handler<S>(State(service): State<Arc<PortfolioService<S>>>) -> Response
where
    S: BatchScorer + 'static,
{
    (StatusCode::OK, axum::Json(service.status())).into_response()
}

pub(crate) async fn clear_handler<S>(State(service): State<Arc<PortfolioService<S>>>) -> StatusCode
where
    S: BatchScorer + 'static,
{
    service.clear();
    StatusCode::NO_CONTENT
}

fn rejected_upload<S>(service: &PortfolioService<S>, message: &str) -> Response
where
    S: BatchScorer + 'static,
{
    service.reject(message);
    error_response(StatusCode::BAD_REQUEST, message)
}

fn service_error_response(err: PortfolioServiceError) -> Response {
    let status = match &err {
        PortfolioServiceError::NoBatch
        | PortfolioServiceError::Scoring(ScoringError::Rejected(_)) => StatusCode::BAD_REQUEST,
        PortfolioServiceError::Scoring(ScoringError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, axum::Json(payload)).into_response()
}
