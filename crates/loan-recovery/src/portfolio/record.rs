use super::domain::{RiskLevel, Strategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped scorer output for a single borrower, keyed by field name.
pub type RawBorrowerRecord = Map<String, Value>;

/// One scored borrower. Construction goes through [`BorrowerRecord::from_raw`],
/// including serde deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBorrowerRecord")]
pub struct BorrowerRecord {
    pub borrower_name: String,
    pub credit_score: i64,
    pub loan_amount: f64,
    pub days_past_due: u32,
    pub default_probability: f64,
    pub risk_level: RiskLevel,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_paid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<f64>,
}

/// Structural validation failure for a raw record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("borrower record must be an object")]
    NotAnObject,
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field `{field}` must not be blank")]
    BlankField { field: &'static str },
}

impl BorrowerRecord {
    /// Type-checks every field. Ranges are the scorer's concern and are not
    /// enforced here.
    pub fn from_raw(raw: &RawBorrowerRecord) -> Result<Self, MalformedRecord> {
        let borrower_name = non_blank(raw, "borrower_name")?;

        Ok(Self {
            borrower_name: borrower_name.to_string(),
            credit_score: integer(required(raw, "credit_score")?, "credit_score")?,
            loan_amount: number(required(raw, "loan_amount")?, "loan_amount")?,
            days_past_due: count(required(raw, "days_past_due")?, "days_past_due")?,
            default_probability: number(
                required(raw, "default_probability")?,
                "default_probability",
            )?,
            risk_level: RiskLevel::from_label(non_blank(raw, "risk_level")?),
            strategy: Strategy::from_label(non_blank(raw, "strategy")?),
            cluster_id: optional(raw, "cluster_id")
                .map(|value| count(value, "cluster_id"))
                .transpose()?,
            total_paid: optional(raw, "total_paid")
                .map(|value| number(value, "total_paid"))
                .transpose()?,
            age: optional(raw, "age")
                .map(|value| count(value, "age"))
                .transpose()?,
            income: optional(raw, "income")
                .map(|value| number(value, "income"))
                .transpose()?,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, MalformedRecord> {
        match value {
            Value::Object(raw) => Self::from_raw(raw),
            _ => Err(MalformedRecord::NotAnObject),
        }
    }
}

impl TryFrom<RawBorrowerRecord> for BorrowerRecord {
    type Error = MalformedRecord;

    fn try_from(raw: RawBorrowerRecord) -> Result<Self, Self::Error> {
        Self::from_raw(&raw)
    }
}

fn required<'a>(raw: &'a RawBorrowerRecord, field: &'static str) -> Result<&'a Value, MalformedRecord> {
    optional(raw, field).ok_or(MalformedRecord::MissingField { field })
}

fn optional<'a>(raw: &'a RawBorrowerRecord, field: &str) -> Option<&'a Value> {
    raw.get(field).filter(|value| !value.is_null())
}

fn text<'a>(raw: &'a RawBorrowerRecord, field: &'static str) -> Result<&'a str, MalformedRecord> {
    required(raw, field)?
        .as_str()
        .ok_or(MalformedRecord::WrongType {
            field,
            expected: "text",
        })
}

fn non_blank<'a>(
    raw: &'a RawBorrowerRecord,
    field: &'static str,
) -> Result<&'a str, MalformedRecord> {
    let value = text(raw, field)?;
    if value.trim().is_empty() {
        return Err(MalformedRecord::BlankField { field });
    }
    Ok(value)
}

fn number(value: &Value, field: &'static str) -> Result<f64, MalformedRecord> {
    value.as_f64().ok_or(MalformedRecord::WrongType {
        field,
        expected: "a number",
    })
}

// Whole floats such as `720.0` are accepted; exports from dataframe tools
// routinely widen integer columns.
fn integer(value: &Value, field: &'static str) -> Result<i64, MalformedRecord> {
    let wrong_type = MalformedRecord::WrongType {
        field,
        expected: "an integer",
    };

    if let Some(int) = value.as_i64() {
        return Ok(int);
    }

    match value.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => Ok(float as i64),
        _ => Err(wrong_type),
    }
}

fn count(value: &Value, field: &'static str) -> Result<u32, MalformedRecord> {
    let int = integer(value, field).map_err(|_| MalformedRecord::WrongType {
        field,
        expected: "a non-negative integer",
    })?;

    u32::try_from(int).map_err(|_| MalformedRecord::WrongType {
        field,
        expected: "a non-negative integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawBorrowerRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn scored_row() -> Value {
        json!({
            "borrower_name": "Ann Lee",
            "credit_score": 712,
            "loan_amount": 15000.0,
            "days_past_due": 12,
            "default_probability": 18.5,
            "risk_level": "Low Risk",
            "strategy": "Automated reminders",
            "cluster_id": 2,
            "total_paid": 9000.0,
            "age": 41,
            "income": 64000.0
        })
    }

    #[test]
    fn builds_record_from_scorer_row() {
        let record = BorrowerRecord::from_value(&scored_row()).expect("valid record");
        assert_eq!(record.borrower_name, "Ann Lee");
        assert_eq!(record.credit_score, 712);
        assert_eq!(record.days_past_due, 12);
        assert_eq!(record.risk_level, RiskLevel::Low);
        assert_eq!(record.strategy, Strategy::AutomatedReminders);
        assert_eq!(record.cluster_id, Some(2));
        assert_eq!(record.age, Some(41));
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let mut row = raw(scored_row());
        row.remove("cluster_id");
        row.insert("income".to_string(), Value::Null);

        let record = BorrowerRecord::from_raw(&row).expect("valid record");
        assert_eq!(record.cluster_id, None);
        assert_eq!(record.income, None);
    }

    #[test]
    fn missing_or_null_required_field_is_malformed() {
        let mut row = raw(scored_row());
        row.remove("loan_amount");
        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::MissingField {
                field: "loan_amount"
            })
        );

        let mut row = raw(scored_row());
        row.insert("risk_level".to_string(), Value::Null);
        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::MissingField {
                field: "risk_level"
            })
        );
    }

    #[test]
    fn non_numeric_credit_score_is_malformed() {
        let mut row = raw(scored_row());
        row.insert("credit_score".to_string(), json!("seven hundred"));

        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::WrongType {
                field: "credit_score",
                expected: "an integer",
            })
        );
    }

    #[test]
    fn fractional_or_negative_counts_are_malformed() {
        let mut row = raw(scored_row());
        row.insert("days_past_due".to_string(), json!(3.5));
        assert!(matches!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::WrongType {
                field: "days_past_due",
                ..
            })
        ));

        let mut row = raw(scored_row());
        row.insert("days_past_due".to_string(), json!(-1));
        assert!(matches!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::WrongType {
                field: "days_past_due",
                ..
            })
        ));
    }

    #[test]
    fn whole_float_integers_are_accepted() {
        let mut row = raw(scored_row());
        row.insert("credit_score".to_string(), json!(640.0));
        let record = BorrowerRecord::from_raw(&row).expect("valid record");
        assert_eq!(record.credit_score, 640);
    }

    #[test]
    fn blank_name_and_non_objects_are_rejected() {
        let mut row = raw(scored_row());
        row.insert("borrower_name".to_string(), json!("   "));
        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::BlankField {
                field: "borrower_name"
            })
        );

        assert_eq!(
            BorrowerRecord::from_value(&json!(["Ann Lee", 712])),
            Err(MalformedRecord::NotAnObject)
        );
    }

    #[test]
    fn blank_tier_or_strategy_is_rejected() {
        let mut row = raw(scored_row());
        row.insert("risk_level".to_string(), json!(""));
        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::BlankField {
                field: "risk_level"
            })
        );

        let mut row = raw(scored_row());
        row.insert("strategy".to_string(), json!("  "));
        assert_eq!(
            BorrowerRecord::from_raw(&row),
            Err(MalformedRecord::BlankField { field: "strategy" })
        );
    }

    #[test]
    fn unknown_tier_and_strategy_labels_are_kept() {
        let mut row = raw(scored_row());
        row.insert("risk_level".to_string(), json!("Severe"));
        row.insert("strategy".to_string(), json!("Debt sale"));

        let record = BorrowerRecord::from_raw(&row).expect("valid record");
        assert_eq!(record.risk_level.label(), "Severe");
        assert_eq!(record.strategy.label(), "Debt sale");
    }

    #[test]
    fn serde_deserialization_runs_validation() {
        let record: BorrowerRecord = serde_json::from_value(scored_row()).expect("valid record");
        assert_eq!(record.default_probability, 18.5);

        let err = serde_json::from_value::<BorrowerRecord>(json!({ "borrower_name": "Cara" }))
            .expect_err("missing fields rejected");
        assert!(err.to_string().contains("credit_score"));
    }
}
