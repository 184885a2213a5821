use super::normalizer::normalize_header;
use super::IntakeError;
use crate::portfolio::record::RawBorrowerRecord;
use serde_json::{Number, Value};
use std::io::Read;

pub(crate) const REQUIRED_COLUMNS: [&str; 7] = [
    "borrower_name",
    "credit_score",
    "loan_amount",
    "days_past_due",
    "default_probability",
    "risk_level",
    "strategy",
];

/// Columns whose cells are never coerced to numbers.
const TEXT_COLUMNS: [&str; 3] = ["borrower_name", "risk_level", "strategy"];

/// A CSV row lifted into the record model's raw form, with its line number.
#[derive(Debug)]
pub(crate) struct ParsedRow {
    pub(crate) line: u64,
    pub(crate) raw: RawBorrowerRecord,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, IntakeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IntakeError::MissingColumns { missing });
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record
            .position()
            .map_or(rows.len() as u64 + 2, |position| position.line());

        let raw = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.clone(), cell_value(header, cell)))
            .collect();

        rows.push(ParsedRow { line, raw });
    }

    Ok(rows)
}

fn cell_value(header: &str, cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if TEXT_COLUMNS.contains(&header) {
        return Value::String(cell.to_string());
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_string()), Value::Number)
}
