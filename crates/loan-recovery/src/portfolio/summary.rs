use super::domain::{RiskLevel, Strategy};
use super::record::BorrowerRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upstream scorers round percentages and money to two decimals.
const CENTS_TOLERANCE: f64 = 0.005 + 1e-9;
/// Upstream scorers round the average credit score to a whole number.
const WHOLE_TOLERANCE: f64 = 0.5 + 1e-9;

/// Aggregate statistics for one batch (or a filtered slice of it).
///
/// Mean and sum fields are `None` for an empty batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_borrowers: usize,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub strategy_distribution: BTreeMap<Strategy, usize>,
    pub avg_default_by_risk: BTreeMap<RiskLevel, f64>,
    pub avg_default_probability: Option<f64>,
    pub avg_credit_score: Option<f64>,
    pub total_loan_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_distribution: BTreeMap<u32, usize>,
}

impl PortfolioSummary {
    pub fn empty() -> Self {
        Self {
            total_borrowers: 0,
            risk_distribution: BTreeMap::new(),
            strategy_distribution: BTreeMap::new(),
            avg_default_by_risk: BTreeMap::new(),
            avg_default_probability: None,
            avg_credit_score: None,
            total_loan_amount: None,
            cluster_distribution: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_borrowers == 0
    }

    /// Count for a tier, zero when the tier is absent from the batch.
    pub fn risk_count(&self, level: &RiskLevel) -> usize {
        self.risk_distribution.get(level).copied().unwrap_or(0)
    }

    pub fn strategy_count(&self, strategy: &Strategy) -> usize {
        self.strategy_distribution.get(strategy).copied().unwrap_or(0)
    }

    /// Names the fields of `upstream` that disagree with `self` beyond the
    /// rounding an upstream scorer applies before publishing its summary.
    pub fn diverging_fields(&self, upstream: &PortfolioSummary) -> Vec<&'static str> {
        let mut fields = Vec::new();

        if self.total_borrowers != upstream.total_borrowers {
            fields.push("total_borrowers");
        }
        if self.risk_distribution != upstream.risk_distribution {
            fields.push("risk_distribution");
        }
        if self.strategy_distribution != upstream.strategy_distribution {
            fields.push("strategy_distribution");
        }
        if !maps_within(
            &self.avg_default_by_risk,
            &upstream.avg_default_by_risk,
            CENTS_TOLERANCE,
        ) {
            fields.push("avg_default_by_risk");
        }
        if !within(
            self.avg_default_probability,
            upstream.avg_default_probability,
            CENTS_TOLERANCE,
        ) {
            fields.push("avg_default_probability");
        }
        if !within(
            self.avg_credit_score,
            upstream.avg_credit_score,
            WHOLE_TOLERANCE,
        ) {
            fields.push("avg_credit_score");
        }
        if !within(
            self.total_loan_amount,
            upstream.total_loan_amount,
            CENTS_TOLERANCE,
        ) {
            fields.push("total_loan_amount");
        }
        if !upstream.cluster_distribution.is_empty()
            && self.cluster_distribution != upstream.cluster_distribution
        {
            fields.push("cluster_distribution");
        }

        fields
    }
}

impl Default for PortfolioSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Derives the canonical summary for a sequence of records.
///
/// Floating sums are taken over sorted values, so the result is identical
/// for any ordering of the same records.
pub fn summarize<'a, I>(records: I) -> PortfolioSummary
where
    I: IntoIterator<Item = &'a BorrowerRecord>,
{
    let mut total_borrowers = 0usize;
    let mut risk_distribution: BTreeMap<RiskLevel, usize> = BTreeMap::new();
    let mut strategy_distribution: BTreeMap<Strategy, usize> = BTreeMap::new();
    let mut cluster_distribution: BTreeMap<u32, usize> = BTreeMap::new();
    let mut probabilities_by_risk: BTreeMap<RiskLevel, Vec<f64>> = BTreeMap::new();
    let mut probabilities = Vec::new();
    let mut credit_scores = Vec::new();
    let mut loan_amounts = Vec::new();

    for record in records {
        total_borrowers += 1;
        *risk_distribution
            .entry(record.risk_level.clone())
            .or_default() += 1;
        *strategy_distribution
            .entry(record.strategy.clone())
            .or_default() += 1;
        if let Some(cluster_id) = record.cluster_id {
            *cluster_distribution.entry(cluster_id).or_default() += 1;
        }

        probabilities_by_risk
            .entry(record.risk_level.clone())
            .or_default()
            .push(record.default_probability);
        probabilities.push(record.default_probability);
        credit_scores.push(record.credit_score as f64);
        loan_amounts.push(record.loan_amount);
    }

    let avg_default_by_risk = probabilities_by_risk
        .into_iter()
        .filter_map(|(level, mut values)| mean(&mut values).map(|avg| (level, avg)))
        .collect();

    PortfolioSummary {
        total_borrowers,
        risk_distribution,
        strategy_distribution,
        avg_default_by_risk,
        avg_default_probability: mean(&mut probabilities),
        avg_credit_score: mean(&mut credit_scores),
        total_loan_amount: (!loan_amounts.is_empty()).then(|| ordered_sum(&mut loan_amounts)),
        cluster_distribution,
    }
}

fn ordered_sum(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

fn mean(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as f64;
    Some(ordered_sum(values) / count)
}

fn within(left: Option<f64>, right: Option<f64>, tolerance: f64) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => (left - right).abs() <= tolerance,
        (None, None) => true,
        _ => false,
    }
}

fn maps_within(
    left: &BTreeMap<RiskLevel, f64>,
    right: &BTreeMap<RiskLevel, f64>,
    tolerance: f64,
) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(level, value)| within(Some(*value), right.get(level).copied(), tolerance))
}
