use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Risk tier assigned by the external scorer.
///
/// Labels outside the three known tiers are carried verbatim in `Other` so
/// that an unexpected scorer output still lands in its own bucket instead of
/// being rejected or folded into a known tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Other(String),
}

impl RiskLevel {
    pub fn ordered() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    /// Exact, case-sensitive match against the scorer's labels.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Low Risk" => Self::Low,
            "Medium Risk" => Self::Medium,
            "High Risk" => Self::High,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
            Self::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Recovery action recommended by the external scorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    AutomatedReminders,
    SettlementOffers,
    LegalActions,
    Other(String),
}

impl Strategy {
    pub fn ordered() -> [Self; 3] {
        [
            Self::AutomatedReminders,
            Self::SettlementOffers,
            Self::LegalActions,
        ]
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Automated reminders" => Self::AutomatedReminders,
            "Settlement offers" => Self::SettlementOffers,
            "Legal actions" => Self::LegalActions,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::AutomatedReminders => "Automated reminders",
            Self::SettlementOffers => "Settlement offers",
            Self::LegalActions => "Legal actions",
            Self::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}
