use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::filter::{filter_and_summarize, BatchQuery, FilteredBatch};
use super::record::BorrowerRecord;
use super::segment::{scatter_series, tier_counts};
use super::state::{BatchState, BatchStore};
use super::summary::{summarize, PortfolioSummary};
use super::views::{BatchStatusView, BatchView, SegmentationView};

/// Payload format of an uploaded batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFormat {
    Csv,
    Json,
}

impl UploadFormat {
    /// Maps a request content type onto a batch format. A missing content
    /// type is treated as CSV, like the dashboard's file picker sends.
    pub fn from_content_type(content_type: Option<&str>) -> Option<Self> {
        let Some(raw) = content_type else {
            return Some(Self::Csv);
        };
        let parsed: mime::Mime = raw.parse().ok()?;

        if parsed.subtype() == mime::JSON || parsed.suffix() == Some(mime::JSON) {
            return Some(Self::Json);
        }

        let is_text = parsed.type_() == mime::TEXT;
        let is_application = parsed.type_() == mime::APPLICATION;
        match parsed.subtype().as_str() {
            "csv" if is_text || is_application => Some(Self::Csv),
            "plain" if is_text => Some(Self::Csv),
            "octet-stream" if is_application => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Raw upload handed to the scoring collaborator.
#[derive(Debug, Clone)]
pub struct BatchUpload {
    pub format: UploadFormat,
    pub body: Vec<u8>,
}

/// Scorer output: per-borrower results plus the scorer's own summary.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub results: Vec<BorrowerRecord>,
    pub summary: PortfolioSummary,
}

impl ScoredBatch {
    /// Builds a batch whose summary is derived locally.
    pub fn from_results(results: Vec<BorrowerRecord>) -> Self {
        let summary = summarize(&results);
        Self { results, summary }
    }
}

/// Boundary to whatever assigns default probabilities, tiers and strategies.
pub trait BatchScorer: Send + Sync {
    fn score(&self, upload: BatchUpload) -> Result<ScoredBatch, ScoringError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("{0}")]
    Rejected(String),
    #[error("scoring service unavailable: {0}")]
    Unavailable(String),
}

/// The currently loaded batch, detached from the store.
#[derive(Debug, Clone)]
pub struct LoadedBatch {
    pub records: Arc<Vec<BorrowerRecord>>,
    pub summary: Arc<PortfolioSummary>,
}

impl LoadedBatch {
    fn from_state(state: &BatchState) -> Option<Self> {
        match (&state.records, &state.summary) {
            (Some(records), Some(summary)) => Some(Self {
                records: Arc::clone(records),
                summary: Arc::clone(summary),
            }),
            _ => None,
        }
    }

    pub fn view(&self) -> BatchView<'_> {
        BatchView {
            summary: &self.summary,
            results: &self.records,
        }
    }

    pub fn filter(&self, query: &BatchQuery) -> FilteredBatch<'_> {
        filter_and_summarize(&self.records, query)
    }

    pub fn segmentation(&self) -> SegmentationView {
        SegmentationView {
            total_borrowers: self.records.len(),
            tiers: tier_counts(self.records.iter()),
            series: scatter_series(self.records.iter()),
        }
    }
}

/// Service composing the scoring collaborator with the dashboard state.
pub struct PortfolioService<S> {
    store: BatchStore,
    scorer: Arc<S>,
}

impl<S> PortfolioService<S>
where
    S: BatchScorer + 'static,
{
    pub fn new(store: BatchStore, scorer: Arc<S>) -> Self {
        Self { store, scorer }
    }

    pub fn store(&self) -> &BatchStore {
        &self.store
    }

    /// Scores an upload and replaces the current batch with the result. A
    /// failed upload is recorded on the state and the previous batch kept.
    pub fn upload(&self, upload: BatchUpload) -> Result<LoadedBatch, PortfolioServiceError> {
        self.store.load_start();

        let scored = match self.scorer.score(upload) {
            Ok(scored) => scored,
            Err(err) => {
                warn!(error = %err, "batch scoring failed");
                self.store.load_error(err.to_string());
                return Err(err.into());
            }
        };

        let diverging = summarize(&scored.results).diverging_fields(&scored.summary);
        if !diverging.is_empty() {
            warn!(
                fields = ?diverging,
                "scorer summary disagrees with recomputed summary"
            );
        }

        let borrowers = scored.results.len();
        let state = self.store.load_success(scored.results, scored.summary);
        info!(borrowers, "batch loaded");

        LoadedBatch::from_state(&state).ok_or(PortfolioServiceError::NoBatch)
    }

    /// Records an upload refused before it reached the scorer. The previous
    /// batch stays loaded.
    pub fn reject(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "batch upload rejected");
        self.store.load_error(message);
    }

    pub fn current(&self) -> Result<LoadedBatch, PortfolioServiceError> {
        LoadedBatch::from_state(&self.store.snapshot()).ok_or(PortfolioServiceError::NoBatch)
    }

    pub fn status(&self) -> BatchStatusView {
        BatchStatusView::from(self.store.snapshot().as_ref())
    }

    pub fn clear(&self) {
        self.store.clear();
        info!("batch cleared");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortfolioServiceError {
    #[error("No data available. Please upload a file first.")]
    NoBatch,
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::domain::{RiskLevel, Strategy};
    use std::sync::Mutex;

    fn borrower(name: &str, risk: RiskLevel, probability: f64) -> BorrowerRecord {
        BorrowerRecord {
            borrower_name: name.to_string(),
            credit_score: 680,
            loan_amount: 8000.0,
            days_past_due: 45,
            default_probability: probability,
            risk_level: risk,
            strategy: Strategy::SettlementOffers,
            cluster_id: None,
            total_paid: None,
            age: None,
            income: None,
        }
    }

    /// Replays queued outcomes in order.
    #[derive(Default)]
    struct ScriptedScorer {
        outcomes: Mutex<Vec<Result<ScoredBatch, ScoringError>>>,
    }

    impl ScriptedScorer {
        fn push(&self, outcome: Result<ScoredBatch, ScoringError>) {
            self.outcomes.lock().expect("scorer mutex").insert(0, outcome);
        }
    }

    impl BatchScorer for ScriptedScorer {
        fn score(&self, _upload: BatchUpload) -> Result<ScoredBatch, ScoringError> {
            self.outcomes
                .lock()
                .expect("scorer mutex")
                .pop()
                .unwrap_or_else(|| Err(ScoringError::Unavailable("no outcome queued".into())))
        }
    }

    fn upload() -> BatchUpload {
        BatchUpload {
            format: UploadFormat::Csv,
            body: Vec::new(),
        }
    }

    #[test]
    fn content_types_map_to_formats() {
        assert_eq!(UploadFormat::from_content_type(None), Some(UploadFormat::Csv));
        assert_eq!(
            UploadFormat::from_content_type(Some("text/csv; charset=utf-8")),
            Some(UploadFormat::Csv)
        );
        assert_eq!(
            UploadFormat::from_content_type(Some("application/json")),
            Some(UploadFormat::Json)
        );
        assert_eq!(
            UploadFormat::from_content_type(Some("application/vnd.scorer+json")),
            Some(UploadFormat::Json)
        );
        assert_eq!(UploadFormat::from_content_type(Some("image/png")), None);
    }

    #[test]
    fn upload_loads_batch_and_current_returns_it() {
        let scorer = Arc::new(ScriptedScorer::default());
        scorer.push(Ok(ScoredBatch::from_results(vec![
            borrower("Ann", RiskLevel::Low, 10.0),
            borrower("Bob", RiskLevel::High, 90.0),
        ])));
        let service = PortfolioService::new(BatchStore::new(), scorer);

        let loaded = service.upload(upload()).expect("upload succeeds");
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.summary.avg_default_probability, Some(50.0));

        let current = service.current().expect("batch present");
        assert!(Arc::ptr_eq(&current.records, &loaded.records));
        assert!(!service.status().loading);
    }

    #[test]
    fn failed_upload_keeps_previous_batch_and_records_error() {
        let scorer = Arc::new(ScriptedScorer::default());
        scorer.push(Ok(ScoredBatch::from_results(vec![borrower(
            "Ann",
            RiskLevel::Low,
            10.0,
        )])));
        scorer.push(Err(ScoringError::Unavailable("network down".into())));
        let service = PortfolioService::new(BatchStore::new(), scorer);

        service.upload(upload()).expect("first upload succeeds");
        let err = service.upload(upload()).expect_err("second upload fails");
        assert!(matches!(
            err,
            PortfolioServiceError::Scoring(ScoringError::Unavailable(_))
        ));

        let status = service.status();
        assert_eq!(
            status.error.as_deref(),
            Some("scoring service unavailable: network down")
        );
        assert!(status.has_batch);
        assert_eq!(status.total_borrowers, 1);
    }

    #[test]
    fn current_without_batch_is_no_batch() {
        let service = PortfolioService::new(BatchStore::new(), Arc::new(ScriptedScorer::default()));
        assert!(matches!(
            service.current(),
            Err(PortfolioServiceError::NoBatch)
        ));
    }

    #[test]
    fn upstream_summary_is_stored_as_given() {
        let results = vec![borrower("Ann", RiskLevel::Low, 10.0)];
        let mut summary = summarize(&results);
        summary.avg_default_probability = Some(10.0);
        summary.avg_credit_score = Some(680.0);
        let upstream = summary.clone();

        let scorer = Arc::new(ScriptedScorer::default());
        scorer.push(Ok(ScoredBatch { results, summary }));
        let service = PortfolioService::new(BatchStore::new(), scorer);

        let loaded = service.upload(upload()).expect("upload succeeds");
        assert_eq!(*loaded.summary, upstream);
    }

    #[test]
    fn loaded_batch_segments_and_filters() {
        let scorer = Arc::new(ScriptedScorer::default());
        scorer.push(Ok(ScoredBatch::from_results(vec![
            borrower("Ann Lee", RiskLevel::Low, 10.0),
            borrower("Bob Ann", RiskLevel::High, 90.0),
            borrower("Cara", RiskLevel::High, 70.0),
        ])));
        let service = PortfolioService::new(BatchStore::new(), scorer);
        let loaded = service.upload(upload()).expect("upload succeeds");

        let segmentation = loaded.segmentation();
        assert_eq!(segmentation.total_borrowers, 3);
        assert_eq!(segmentation.tiers[2].count, 2);
        assert_eq!(segmentation.series.len(), 3);

        let query = BatchQuery {
            search: "ann".to_string(),
            ..BatchQuery::default()
        };
        let filtered = loaded.filter(&query);
        assert_eq!(filtered.records.len(), 2);
        assert_eq!(filtered.summary.avg_default_probability, Some(50.0));

        service.clear();
        assert!(!service.status().has_batch);
    }
}
