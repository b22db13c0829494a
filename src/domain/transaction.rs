//! Canonical transaction records consumed by the aggregation pipeline.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::common::*;

/// Direction of a transaction. The numeric amount never carries the sign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub description: String,
    /// Category name, matched case-sensitively.
    pub category: String,
    pub amount: f64,
    /// ISO-8601 date or date-time.
    pub date: String,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        date: impl Into<String>,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category: category.into(),
            amount: amount.abs(),
            date: date.into(),
            kind,
        }
    }

    pub fn expense(
        id: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        date: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self::new(id, category.clone(), category, amount, date, TransactionKind::Expense)
    }

    pub fn income(
        id: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        date: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self::new(id, category.clone(), category, amount, date, TransactionKind::Income)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Parses `date` into a UTC wall-clock instant, `None` when unparsable.
    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        parse_instant(&self.date)
    }

    /// Applies the fields present in `patch`, keeping the amount unsigned.
    pub fn apply_patch(&mut self, patch: &TransactionPatch) {
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount.abs();
        }
        if let Some(date) = &patch.date {
            self.date = date.clone();
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Amounted for Transaction {
    fn amount(&self) -> f64 {
        self.amount.abs()
    }
}

/// Accepts RFC 3339 (converted to UTC), naive date-times, and plain `YYYY-MM-DD` dates.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Fields of a transaction a user may change; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
}

impl TransactionPatch {
    pub fn has_effect(&self) -> bool {
        self.description.is_some()
            || self.category.is_some()
            || self.amount.is_some()
            || self.date.is_some()
            || self.kind.is_some()
    }
}

/// A transaction the user entered that has no server identity yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub date: String,
    pub kind: TransactionKind,
}

impl TransactionDraft {
    pub fn into_transaction(self, id: impl Into<String>) -> Transaction {
        Transaction::new(
            id,
            self.description,
            self.category,
            self.amount,
            self.date,
            self.kind,
        )
    }
}
