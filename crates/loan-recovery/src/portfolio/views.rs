use super::filter::{BatchQuery, FilteredBatch};
use super::record::BorrowerRecord;
use super::segment::{ScatterSeries, TierCountEntry};
use super::state::BatchState;
use super::summary::PortfolioSummary;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BatchView<'a> {
    pub summary: &'a PortfolioSummary,
    pub results: &'a [BorrowerRecord],
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadView<'a> {
    pub message: &'static str,
    pub results: &'a [BorrowerRecord],
    pub summary: &'a PortfolioSummary,
    pub total_borrowers: usize,
}

impl<'a> UploadView<'a> {
    pub fn new(batch: BatchView<'a>) -> Self {
        Self {
            message: "File processed successfully",
            results: batch.results,
            summary: batch.summary,
            total_borrowers: batch.results.len(),
        }
    }
}

/// Result table payload. `empty` is set when nothing matched, in which case
/// the summary's means are null.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredResultsView<'a> {
    pub query: &'a BatchQuery,
    pub total_matches: usize,
    pub empty: bool,
    pub results: Vec<&'a BorrowerRecord>,
    pub summary: PortfolioSummary,
}

impl<'a> FilteredResultsView<'a> {
    pub fn new(query: &'a BatchQuery, filtered: FilteredBatch<'a>) -> Self {
        Self {
            query,
            total_matches: filtered.records.len(),
            empty: filtered.is_empty(),
            results: filtered.records,
            summary: filtered.summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentationView {
    pub total_borrowers: usize,
    pub tiers: Vec<TierCountEntry>,
    pub series: Vec<ScatterSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatusView {
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub has_batch: bool,
    pub total_borrowers: usize,
}

impl From<&BatchState> for BatchStatusView {
    fn from(state: &BatchState) -> Self {
        Self {
            loading: state.loading,
            error: state.error.clone(),
            has_batch: state.has_batch(),
            total_borrowers: state.total_borrowers(),
        }
    }
}
