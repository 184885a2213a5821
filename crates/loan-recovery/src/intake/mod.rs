//! Reading already-scored batches (CSV exports or the scorer's JSON payload)
//! into validated borrower records.

mod normalizer;
mod parser;

use crate::portfolio::record::{BorrowerRecord, MalformedRecord};
use crate::portfolio::service::{
    BatchScorer, BatchUpload, ScoredBatch, ScoringError, UploadFormat,
};
use crate::portfolio::summary::PortfolioSummary;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to read scored batch: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scored CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid scored JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("scored JSON payload must be an array of results or an object with a `results` array")]
    MissingResults,
    #[error("malformed record at row {row}: {source}")]
    Record {
        row: u64,
        #[source]
        source: MalformedRecord,
    },
}

pub struct ScoredBatchImporter;

impl ScoredBatchImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        format: UploadFormat,
    ) -> Result<ScoredBatch, IntakeError> {
        let file = std::fs::File::open(path)?;
        match format {
            UploadFormat::Csv => Self::from_csv_reader(file),
            UploadFormat::Json => Self::from_json_reader(file),
        }
    }

    /// CSV rows are numbered by file line, header included.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<ScoredBatch, IntakeError> {
        let rows = parser::parse_rows(reader)?;
        let results = rows
            .iter()
            .map(|row| {
                BorrowerRecord::from_raw(&row.raw).map_err(|source| IntakeError::Record {
                    row: row.line,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = results.len(), "parsed scored CSV batch");
        Ok(ScoredBatch::from_results(results))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<ScoredBatch, IntakeError> {
        let payload: Value = serde_json::from_reader(reader)?;
        Self::from_json_value(payload)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<ScoredBatch, IntakeError> {
        let payload: Value = serde_json::from_slice(bytes)?;
        Self::from_json_value(payload)
    }

    /// JSON results are numbered from 1 in array order. A supplied `summary`
    /// is kept as given; otherwise one is derived from the results.
    pub fn from_json_value(payload: Value) -> Result<ScoredBatch, IntakeError> {
        let (results, summary) = match payload {
            Value::Array(results) => (results, None),
            Value::Object(mut object) => {
                let results = match object.remove("results") {
                    Some(Value::Array(results)) => results,
                    _ => return Err(IntakeError::MissingResults),
                };
                let summary = match object.remove("summary") {
                    Some(Value::Null) | None => None,
                    Some(summary) => Some(serde_json::from_value::<PortfolioSummary>(summary)?),
                };
                (results, summary)
            }
            _ => return Err(IntakeError::MissingResults),
        };

        let results = results
            .iter()
            .zip(1u64..)
            .map(|(value, row)| {
                BorrowerRecord::from_value(value)
                    .map_err(|source| IntakeError::Record { row, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            rows = results.len(),
            upstream_summary = summary.is_some(),
            "parsed scored JSON batch"
        );
        Ok(match summary {
            Some(summary) => ScoredBatch { results, summary },
            None => ScoredBatch::from_results(results),
        })
    }
}

/// Scoring collaborator for uploads that arrive already scored.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrescoredBatchScorer;

impl BatchScorer for PrescoredBatchScorer {
    fn score(&self, upload: BatchUpload) -> Result<ScoredBatch, ScoringError> {
        let imported = match upload.format {
            UploadFormat::Csv => ScoredBatchImporter::from_csv_reader(upload.body.as_slice()),
            UploadFormat::Json => ScoredBatchImporter::from_json_slice(&upload.body),
        };

        imported.map_err(|err| match err {
            io @ IntakeError::Io(_) => ScoringError::Unavailable(io.to_string()),
            other => ScoringError::Rejected(other.to_string()),
        })
    }
}
