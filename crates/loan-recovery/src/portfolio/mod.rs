//! Scored-portfolio aggregation, segmentation and filtering, plus the batch
//! state and service that the dashboard endpoints read from.

pub mod domain;
pub mod filter;
pub mod record;
pub mod router;
pub mod segment;
pub mod service;
pub mod state;
pub mod summary;
pub mod views;

pub use domain::{RiskLevel, Strategy};
pub use filter::{filter_and_summarize, filter_records, BatchQuery, FilteredBatch, RiskFilter};
pub use record::{BorrowerRecord, MalformedRecord, RawBorrowerRecord};
pub use router::portfolio_router;
pub use segment::{scatter_series, segment, tier_counts, RiskSegments, ScatterPoint, ScatterSeries};
pub use service::{
    BatchScorer, BatchUpload, LoadedBatch, PortfolioService, PortfolioServiceError, ScoredBatch,
    ScoringError, UploadFormat,
};
pub use state::{BatchAction, BatchState, BatchStore};
pub use summary::{summarize, PortfolioSummary};
