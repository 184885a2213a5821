use super::domain::RiskLevel;
use super::record::BorrowerRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Members of each risk tier, in batch order.
pub type RiskSegments<'a> = BTreeMap<RiskLevel, Vec<&'a BorrowerRecord>>;

/// Stable partition of `records` by their literal risk tier.
pub fn segment<'a, I>(records: I) -> RiskSegments<'a>
where
    I: IntoIterator<Item = &'a BorrowerRecord>,
{
    let mut segments: RiskSegments<'a> = BTreeMap::new();
    for record in records {
        segments
            .entry(record.risk_level.clone())
            .or_default()
            .push(record);
    }
    segments
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierCountEntry {
    pub risk_level: RiskLevel,
    pub count: usize,
}

/// Known tiers first (zero-filled), then any other tiers present.
pub fn tier_counts<'a, I>(records: I) -> Vec<TierCountEntry>
where
    I: IntoIterator<Item = &'a BorrowerRecord>,
{
    let mut segments = segment(records);
    let mut entries: Vec<TierCountEntry> = RiskLevel::ordered()
        .into_iter()
        .map(|risk_level| TierCountEntry {
            count: segments.remove(&risk_level).map_or(0, |members| members.len()),
            risk_level,
        })
        .collect();

    entries.extend(
        segments
            .into_iter()
            .map(|(risk_level, members)| TierCountEntry {
                risk_level,
                count: members.len(),
            }),
    );
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub borrower_name: String,
    pub credit_score: i64,
    pub default_probability: f64,
}

/// Credit score against default probability for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub risk_level: RiskLevel,
    pub points: Vec<ScatterPoint>,
}

/// One series per known tier, even when empty, followed by any other tiers.
pub fn scatter_series<'a, I>(records: I) -> Vec<ScatterSeries>
where
    I: IntoIterator<Item = &'a BorrowerRecord>,
{
    let mut segments = segment(records);
    let mut series: Vec<ScatterSeries> = RiskLevel::ordered()
        .into_iter()
        .map(|risk_level| {
            let members = segments.remove(&risk_level).unwrap_or_default();
            to_series(risk_level, members)
        })
        .collect();

    series.extend(
        segments
            .into_iter()
            .map(|(risk_level, members)| to_series(risk_level, members)),
    );
    series
}

fn to_series(risk_level: RiskLevel, members: Vec<&BorrowerRecord>) -> ScatterSeries {
    ScatterSeries {
        risk_level,
        points: members
            .into_iter()
            .map(|record| ScatterPoint {
                borrower_name: record.borrower_name.clone(),
                credit_score: record.credit_score,
                default_probability: record.default_probability,
            })
            .collect(),
    }
}
