//! Storage-boundary normalization.
//!
//! The storage collaborator hands over loosely shaped records: categories arrive
//! as plain names or as `{ "name": … }` objects, amounts as signed or unsigned
//! numbers or numeric strings, and optional fields may be missing entirely.
//! Everything is folded into the canonical [`Transaction`] and [`CategoryBudget`]
//! shapes here, before any aggregation runs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::budget::CategoryBudget;
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::errors::DataQualityWarning;

pub const UNCATEGORIZED: &str = "Uncategorized";

const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawCategory {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

impl RawCategory {
    fn name(&self) -> Option<&str> {
        let name = match self {
            RawCategory::Name(name) => Some(name.as_str()),
            RawCategory::Object { name } => name.as_deref(),
        };
        name.map(str::trim).filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn value(&self) -> Option<f64> {
        let value = match self {
            RawAmount::Number(number) => *number,
            RawAmount::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default, alias = "_id")]
    pub id: Option<RawId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<RawCategory>,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBudget {
    #[serde(default, alias = "category_id")]
    pub category_id: Option<RawId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub category: Option<RawCategory>,
    #[serde(default, alias = "amount")]
    pub limit: Option<RawAmount>,
    #[serde(default, alias = "month")]
    pub period_month: Option<u32>,
    #[serde(default, alias = "year")]
    pub period_year: Option<i32>,
}

/// Canonical records plus the problems found while producing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Normalizes transactions, substituting defaults for absent fields.
///
/// Absent category becomes [`UNCATEGORIZED`], absent amount becomes `0`, and an
/// absent date becomes `now`. Unparsable dates are kept verbatim; the aggregator
/// skips and reports them.
pub fn normalize_transactions(
    raw: Vec<RawTransaction>,
    now: NaiveDateTime,
) -> Normalized<Transaction> {
    normalize_transactions_with_label(raw, now, UNCATEGORIZED)
}

/// Same as [`normalize_transactions`] with a custom label for missing categories.
pub fn normalize_transactions_with_label(
    raw: Vec<RawTransaction>,
    now: NaiveDateTime,
    uncategorized: &str,
) -> Normalized<Transaction> {
    let mut warnings = Vec::new();
    let records = raw
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            normalize_transaction(index, record, now, uncategorized, &mut warnings)
        })
        .collect();
    Normalized { records, warnings }
}

fn normalize_transaction(
    index: usize,
    record: RawTransaction,
    now: NaiveDateTime,
    uncategorized: &str,
    warnings: &mut Vec<DataQualityWarning>,
) -> Transaction {
    let id = match record.id {
        Some(id) => id.into_string(),
        None => {
            let generated = format!("record-{index}");
            warnings.push(DataQualityWarning::new(&generated, "id", "missing id, generated one"));
            generated
        }
    };

    let category = record
        .category
        .as_ref()
        .and_then(RawCategory::name)
        .unwrap_or(uncategorized)
        .to_string();

    let signed = match &record.amount {
        None => 0.0,
        Some(amount) => amount.value().unwrap_or_else(|| {
            warnings.push(DataQualityWarning::new(
                &id,
                "amount",
                format!("unparsable amount {amount:?}, using 0"),
            ));
            0.0
        }),
    };

    let kind = match record.kind.as_deref().map(|kind| kind.trim().to_ascii_lowercase()) {
        Some(kind) if kind == "income" => TransactionKind::Income,
        Some(kind) if kind == "expense" => TransactionKind::Expense,
        Some(other) => {
            warnings.push(DataQualityWarning::new(
                &id,
                "kind",
                format!("unknown kind `{other}`, treating as expense"),
            ));
            TransactionKind::Expense
        }
        None => TransactionKind::Expense,
    };

    let date = match record.date {
        Some(date) if !date.trim().is_empty() => date,
        _ => now.format(NOW_FORMAT).to_string(),
    };

    Transaction::new(
        id,
        record.description.unwrap_or_default(),
        category,
        signed,
        date,
        kind,
    )
}

/// Normalizes budgets. Records without a period cannot be matched and are dropped with a warning.
pub fn normalize_budgets(raw: Vec<RawBudget>) -> Normalized<CategoryBudget> {
    let mut warnings = Vec::new();
    let mut records = Vec::new();

    for (index, record) in raw.into_iter().enumerate() {
        let name = record
            .category_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| record.category.as_ref().and_then(RawCategory::name))
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        let category_id = record
            .category_id
            .map(RawId::into_string)
            .unwrap_or_else(|| name.clone());

        let (Some(month), Some(year)) = (record.period_month, record.period_year) else {
            warnings.push(DataQualityWarning::new(
                format!("budget-{index}"),
                "period",
                "budget has no period month/year",
            ));
            continue;
        };
        if !(1..=12).contains(&month) {
            warnings.push(DataQualityWarning::new(
                format!("budget-{index}"),
                "periodMonth",
                format!("month {month} is outside 1..=12"),
            ));
            continue;
        }

        let limit = match &record.limit {
            None => 0.0,
            Some(amount) => match amount.value() {
                Some(value) if value >= 0.0 => value,
                Some(value) => {
                    warnings.push(DataQualityWarning::new(
                        &category_id,
                        "limit",
                        format!("negative limit {value}, using 0"),
                    ));
                    0.0
                }
                None => {
                    warnings.push(DataQualityWarning::new(
                        &category_id,
                        "limit",
                        "unparsable limit, using 0",
                    ));
                    0.0
                }
            },
        };

        records.push(CategoryBudget::new(category_id, name, limit, month, year));
    }

    Normalized { records, warnings }
}
