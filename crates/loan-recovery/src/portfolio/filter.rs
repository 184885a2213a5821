use super::domain::RiskLevel;
use super::record::BorrowerRecord;
use super::summary::{summarize, PortfolioSummary};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::str::FromStr;

/// Sentinel accepted wherever a risk filter is parsed from text.
pub const ALL_TIERS: &str = "all";

/// Restricts a result table to one risk tier, or to none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RiskFilter {
    #[default]
    All,
    Only(RiskLevel),
}

impl RiskFilter {
    pub fn matches(&self, level: &RiskLevel) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == level,
        }
    }
}

/// An empty value, as sent by a cleared dropdown, selects every tier. Records
/// never carry a blank tier, so nothing becomes unreachable.
impl FromStr for RiskFilter {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() || raw == ALL_TIERS {
            Ok(Self::All)
        } else {
            Ok(Self::Only(RiskLevel::from_label(raw)))
        }
    }
}

impl Serialize for RiskFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str(ALL_TIERS),
            Self::Only(level) => level.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RiskFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse::<Self>().unwrap_or_default())
    }
}

/// Search box plus tier dropdown, as submitted by a result table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub risk: RiskFilter,
}

impl BatchQuery {
    pub fn is_unrestricted(&self) -> bool {
        self.search.is_empty() && self.risk == RiskFilter::All
    }
}

/// Records whose name contains `search_term` (ignoring case) and whose tier
/// passes `risk_filter`, in their original order.
pub fn filter_records<'a, I>(
    records: I,
    search_term: &str,
    risk_filter: &RiskFilter,
) -> Vec<&'a BorrowerRecord>
where
    I: IntoIterator<Item = &'a BorrowerRecord>,
{
    let needle = search_term.to_lowercase();
    records
        .into_iter()
        .filter(|record| risk_filter.matches(&record.risk_level))
        .filter(|record| {
            needle.is_empty() || record.borrower_name.to_lowercase().contains(&needle)
        })
        .collect()
}

/// A filtered slice of a batch together with its own summary.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredBatch<'a> {
    pub records: Vec<&'a BorrowerRecord>,
    pub summary: PortfolioSummary,
}

impl FilteredBatch<'_> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn filter_and_summarize<'a>(
    records: &'a [BorrowerRecord],
    query: &BatchQuery,
) -> FilteredBatch<'a> {
    let records = filter_records(records, &query.search, &query.risk);
    let summary = summarize(records.iter().copied());
    FilteredBatch { records, summary }
}
