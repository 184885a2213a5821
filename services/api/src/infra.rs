use loan_recovery::intake::PrescoredBatchScorer;
use loan_recovery::portfolio::{BatchStore, PortfolioService, UploadFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type PrescoredPortfolio = PortfolioService<PrescoredBatchScorer>;

pub(crate) fn prescored_portfolio() -> Arc<PrescoredPortfolio> {
    Arc::new(PortfolioService::new(
        BatchStore::new(),
        Arc::new(PrescoredBatchScorer),
    ))
}

/// Format implied by a file's extension; unknown extensions are treated as CSV.
pub(crate) fn upload_format_for(path: &Path) -> UploadFormat {
    let guessed = mime_guess::from_path(path).first();
    let essence = guessed.as_ref().map(|mime| mime.essence_str());
    UploadFormat::from_content_type(essence).unwrap_or(UploadFormat::Csv)
}
