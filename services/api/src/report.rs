use crate::infra::{prescored_portfolio, upload_format_for};
use clap::Args;
use loan_recovery::error::AppError;
use loan_recovery::portfolio::{
    tier_counts, BatchQuery, BatchUpload, BorrowerRecord, LoadedBatch, PortfolioSummary,
    RiskFilter, Strategy,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Pre-scored batch file (CSV, or JSON scorer output)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Case-insensitive borrower name filter
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Restrict to one risk tier label, or `all`
    #[arg(long)]
    pub(crate) risk: Option<String>,
    /// Print every borrower in the filtered scope
    #[arg(long)]
    pub(crate) list_borrowers: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        input,
        search,
        risk,
        list_borrowers,
    } = args;

    let upload = BatchUpload {
        format: upload_format_for(&input),
        body: std::fs::read(&input)?,
    };
    let batch = prescored_portfolio().upload(upload)?;

    let query = BatchQuery {
        search: search.unwrap_or_default(),
        risk: risk
            .as_deref()
            .map(|label| label.parse::<RiskFilter>().unwrap_or_default())
            .unwrap_or_default(),
    };

    print!("{}", render_report(&input, &batch, &query, list_borrowers));
    Ok(())
}

pub(crate) fn render_report(
    input: &std::path::Path,
    batch: &LoadedBatch,
    query: &BatchQuery,
    list_borrowers: bool,
) -> String {
    let mut out = String::new();
    out.push_str("Loan recovery portfolio report\n");
    out.push_str(&format!("Source: {}\n", input.display()));

    out.push_str("\nPortfolio summary\n");
    render_summary(&mut out, &batch.summary);

    out.push_str("\nBorrowers per risk tier\n");
    for entry in tier_counts(batch.records.iter()) {
        let marker = if entry.risk_level.is_known() {
            ""
        } else {
            " (unrecognized tier)"
        };
        out.push_str(&format!(
            "- {}: {}{}\n",
            entry.risk_level, entry.count, marker
        ));
    }

    if !batch.summary.cluster_distribution.is_empty() {
        out.push_str("\nBorrowers per cluster\n");
        for (cluster, count) in &batch.summary.cluster_distribution {
            out.push_str(&format!("- cluster {}: {}\n", cluster, count));
        }
    }

    let filtered = batch.filter(query);
    if !query.is_unrestricted() {
        out.push_str(&format!(
            "\nFiltered scope (search \"{}\", risk {}): {} of {} borrowers\n",
            query.search,
            risk_label(&query.risk),
            filtered.records.len(),
            batch.records.len()
        ));
        if filtered.is_empty() {
            out.push_str("No borrowers match the current filters.\n");
        } else {
            render_summary(&mut out, &filtered.summary);
        }
    }

    if list_borrowers && !filtered.is_empty() {
        out.push_str("\nBorrowers\n");
        for record in &filtered.records {
            out.push_str(&borrower_line(record));
        }
    }

    out
}

fn render_summary(out: &mut String, summary: &PortfolioSummary) {
    out.push_str(&format!("- Total borrowers: {}\n", summary.total_borrowers));
    out.push_str(&format!(
        "- Average default probability: {}\n",
        format_mean(summary.avg_default_probability, "%")
    ));
    out.push_str(&format!(
        "- Average credit score: {}\n",
        format_mean(summary.avg_credit_score, "")
    ));
    out.push_str(&format!(
        "- Total loan amount: {}\n",
        summary
            .total_loan_amount
            .map_or_else(|| "n/a".to_string(), |total| format!("${total:.2}"))
    ));

    for strategy in Strategy::ordered() {
        out.push_str(&format!(
            "- {}: {} borrowers\n",
            strategy,
            summary.strategy_count(&strategy)
        ));
    }
    for (strategy, count) in &summary.strategy_distribution {
        if !strategy.is_known() {
            out.push_str(&format!("- {}: {} borrowers\n", strategy, count));
        }
    }
    for (level, average) in &summary.avg_default_by_risk {
        out.push_str(&format!(
            "- {} average default probability: {:.1}%\n",
            level, average
        ));
    }
}

fn format_mean(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(value) => format!("{value:.1}{unit}"),
        None => "n/a".to_string(),
    }
}

fn risk_label(filter: &RiskFilter) -> String {
    match filter {
        RiskFilter::All => "all".to_string(),
        RiskFilter::Only(level) => level.to_string(),
    }
}

fn borrower_line(record: &BorrowerRecord) -> String {
    format!(
        "- {} | score {} | ${:.2} | {} days past due | {:.1}% | {} | {}\n",
        record.borrower_name,
        record.credit_score,
        record.loan_amount,
        record.days_past_due,
        record.default_probability,
        record.risk_level,
        record.strategy
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_recovery::intake::ScoredBatchImporter;
    use loan_recovery::portfolio::{RiskLevel, ScoredBatch};
    use std::path::Path;
    use std::sync::Arc;

    const SCORED_CSV: &str = "borrower_name,credit_score,loan_amount,days_past_due,default_probability,risk_level,strategy\n\
Ann Lee,720,5000,0,10,Low Risk,Automated reminders\n\
Bob Ann,540,9000,120,90,High Risk,Legal actions\n\
Cy Moss,610,1000,45,50,Medium Risk,Settlement offers\n";

    fn loaded() -> LoadedBatch {
        let ScoredBatch { results, summary } =
            ScoredBatchImporter::from_csv_reader(SCORED_CSV.as_bytes()).expect("import");
        LoadedBatch {
            records: Arc::new(results),
            summary: Arc::new(summary),
        }
    }

    #[test]
    fn unfiltered_report_lists_portfolio_and_tiers() {
        let output = render_report(
            Path::new("batch.csv"),
            &loaded(),
            &BatchQuery::default(),
            false,
        );

        assert!(output.contains("- Total borrowers: 3"));
        assert!(output.contains("- Average default probability: 50.0%"));
        assert!(output.contains("- Total loan amount: $15000.00"));
        assert!(output.contains("- Low Risk: 1"));
        assert!(!output.contains("Filtered scope"));
        assert!(!output.contains("\nBorrowers\n"));
    }

    #[test]
    fn filtered_report_summarizes_matching_scope() {
        let query = BatchQuery {
            search: "ann".to_string(),
            risk: RiskFilter::Only(RiskLevel::High),
        };
        let output = render_report(Path::new("batch.csv"), &loaded(), &query, true);

        assert!(output.contains("1 of 3 borrowers"));
        assert!(output.contains("- Bob Ann | score 540"));
        assert!(!output.contains("- Ann Lee | score"));
    }

    #[test]
    fn strategies_are_zero_filled_and_unknown_labels_listed() {
        let csv = "borrower_name,credit_score,loan_amount,days_past_due,default_probability,risk_level,strategy\n\
Ann Lee,720,5000,0,10,Low Risk,Automated reminders\n\
Dee Park,500,3000,200,97,Critical,Debt sale\n";
        let ScoredBatch { results, summary } =
            ScoredBatchImporter::from_csv_reader(csv.as_bytes()).expect("import");
        let batch = LoadedBatch {
            records: Arc::new(results),
            summary: Arc::new(summary),
        };

        let output = render_report(Path::new("batch.csv"), &batch, &BatchQuery::default(), false);

        assert!(output.contains("- Automated reminders: 1 borrowers"));
        assert!(output.contains("- Legal actions: 0 borrowers"));
        assert!(output.contains("- Debt sale: 1 borrowers"));
        assert!(output.contains("- Critical: 1 (unrecognized tier)"));
        assert!(output.contains("- High Risk: 0\n"));
    }

    #[test]
    fn empty_scope_is_reported() {
        let query = BatchQuery {
            search: "zed".to_string(),
            risk: RiskFilter::All,
        };
        let output = render_report(Path::new("batch.csv"), &loaded(), &query, true);

        assert!(output.contains("0 of 3 borrowers"));
        assert!(output.contains("No borrowers match the current filters."));
    }
}
