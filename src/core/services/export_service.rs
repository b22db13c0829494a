//! Flattens aggregation and budget results into a fixed-order table.
//!
//! Layout, one row per line:
//!
//! ```text
//! Monthly Data
//! Month,Amount
//! 2025-01,120.00
//! Category Data
//! Category,Amount
//! Food,120.00
//! Summary
//! Metric,Value
//! Total Budget,100.00
//! Total Spent,120.00
//! Percentage Used,120.00
//! Average Monthly Spend,120.00
//! ```
//!
//! Numbers always carry two decimals with a `.` separator; display formatting
//! belongs to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::domain::budget::OverallBudget;
use crate::domain::summary::{total_of, CategoryTotal, MonthBucketTotal};
use crate::errors::{EngineError, EngineResult};
use crate::ledger::time_window::MonthBucket;
use crate::utils::{format_amount, round2};

pub const MONTHLY_SECTION: &str = "Monthly Data";
pub const CATEGORY_SECTION: &str = "Category Data";
pub const SUMMARY_SECTION: &str = "Summary";

const MONTHLY_HEADER: [&str; 2] = ["Month", "Amount"];
const CATEGORY_HEADER: [&str; 2] = ["Category", "Amount"];
const SUMMARY_HEADER: [&str; 2] = ["Metric", "Value"];

const TOTAL_BUDGET: &str = "Total Budget";
const TOTAL_SPENT: &str = "Total Spent";
const PERCENTAGE_USED: &str = "Percentage Used";
const AVERAGE_MONTHLY_SPEND: &str = "Average Monthly Spend";

/// Ordered rows of string cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportTable {
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn push<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Renders the rows as CSV: comma separated, `\n` terminated, quoted only when needed.
    pub fn to_csv(&self) -> EngineResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| EngineError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| EngineError::Export(err.to_string()))
    }

    pub fn parse_csv(input: &str) -> EngineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes());
        let mut table = ReportTable::default();
        for record in reader.records() {
            let record = record?;
            table.push(record.iter());
        }
        Ok(table)
    }
}

/// Summary block values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub percentage_used: f64,
    pub average_monthly_spend: f64,
}

/// Values recovered from a [`ReportTable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReport {
    pub month_totals: Vec<MonthBucketTotal>,
    pub category_totals: Vec<CategoryTotal>,
    pub summary: ReportSummary,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Monthly,
    Category,
    Summary,
}

pub struct ExportService;

impl ExportService {
    pub fn summarize(month_totals: &[MonthBucketTotal], overall: &OverallBudget) -> ReportSummary {
        let average_monthly_spend = if month_totals.is_empty() {
            0.0
        } else {
            total_of(month_totals) / month_totals.len() as f64
        };
        ReportSummary {
            total_budget: overall.total_budget,
            total_spent: overall.total_spent,
            percentage_used: overall.percentage_used,
            average_monthly_spend: round2(average_monthly_spend),
        }
    }

    pub fn build(
        month_totals: &[MonthBucketTotal],
        category_totals: &[CategoryTotal],
        overall: &OverallBudget,
    ) -> ReportTable {
        let mut table = ReportTable::default();

        table.push([MONTHLY_SECTION]);
        table.push(MONTHLY_HEADER);
        for bucket in month_totals {
            table.push([bucket.key.clone(), format_amount(bucket.total)]);
        }

        table.push([CATEGORY_SECTION]);
        table.push(CATEGORY_HEADER);
        for category in category_totals {
            table.push([category.name.clone(), format_amount(category.total)]);
        }

        let summary = Self::summarize(month_totals, overall);
        table.push([SUMMARY_SECTION]);
        table.push(SUMMARY_HEADER);
        table.push([TOTAL_BUDGET.to_string(), format_amount(summary.total_budget)]);
        table.push([TOTAL_SPENT.to_string(), format_amount(summary.total_spent)]);
        table.push([PERCENTAGE_USED.to_string(), format_amount(summary.percentage_used)]);
        table.push([
            AVERAGE_MONTHLY_SPEND.to_string(),
            format_amount(summary.average_monthly_spend),
        ]);

        tracing::debug!(rows = table.rows.len(), "built export table");
        table
    }

    /// Reads a table produced by [`ExportService::build`] back into values.
    pub fn parse(table: &ReportTable) -> EngineResult<ParsedReport> {
        let mut parsed = ParsedReport::default();
        let mut section = Section::Preamble;

        for (line, row) in table.rows().iter().enumerate() {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            match cells.as_slice() {
                [title] if *title == MONTHLY_SECTION => section = Section::Monthly,
                [title] if *title == CATEGORY_SECTION => section = Section::Category,
                [title] if *title == SUMMARY_SECTION => section = Section::Summary,
                [a, b] if [*a, *b] == MONTHLY_HEADER && section == Section::Monthly => {}
                [a, b] if [*a, *b] == CATEGORY_HEADER && section == Section::Category => {}
                [a, b] if [*a, *b] == SUMMARY_HEADER && section == Section::Summary => {}
                [label, value] => {
                    let value = parse_number(line, value)?;
                    match section {
                        Section::Monthly => {
                            parsed.month_totals.push(month_total(line, label, value)?)
                        }
                        Section::Category => parsed.category_totals.push(CategoryTotal {
                            name: label.to_string(),
                            total: value,
                        }),
                        Section::Summary => match *label {
                            TOTAL_BUDGET => parsed.summary.total_budget = value,
                            TOTAL_SPENT => parsed.summary.total_spent = value,
                            PERCENTAGE_USED => parsed.summary.percentage_used = value,
                            AVERAGE_MONTHLY_SPEND => parsed.summary.average_monthly_spend = value,
                            other => {
                                return Err(unexpected(line, format!("unknown metric `{other}`")))
                            }
                        },
                        Section::Preamble => {
                            return Err(unexpected(line, "data row before any section".into()))
                        }
                    }
                }
                _ => return Err(unexpected(line, format!("unexpected row {row:?}"))),
            }
        }

        Ok(parsed)
    }
}

fn unexpected(line: usize, reason: String) -> EngineError {
    EngineError::Export(format!("row {}: {reason}", line + 1))
}

fn parse_number(line: usize, raw: &str) -> EngineResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| unexpected(line, format!("`{raw}` is not a number")))
}

fn month_total(line: usize, key: &str, total: f64) -> EngineResult<MonthBucketTotal> {
    let (year, month) = key
        .split_once('-')
        .and_then(|(year, month)| Some((year.parse::<i32>().ok()?, month.parse::<u32>().ok()?)))
        .filter(|(_, month)| (1..=12).contains(month))
        .ok_or_else(|| unexpected(line, format!("`{key}` is not a YYYY-MM key")))?;
    let bucket = MonthBucket::for_month(year, month);
    Ok(MonthBucketTotal {
        key: bucket.key,
        label: bucket.label,
        total,
    })
}
