use std::result::Result as StdResult;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Error type shared by the window, aggregation, budget, export, and mutation layers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Date {date} is after the reference instant {now}")]
    FutureDateRejected {
        date: NaiveDateTime,
        now: NaiveDateTime,
    },
    #[error("Duplicate budget for category {category_id} in {year}-{month:02}")]
    DuplicateBudgetKey {
        category_id: String,
        month: u32,
        year: i32,
    },
    #[error("Mutation {mutation} failed: {reason}")]
    MutationFailed { mutation: u64, reason: String },
    #[error("Trend analysis needs at least {required} buckets, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("Transaction not found: {0}")]
    UnknownTransaction(String),
    #[error("Mutation not found or already settled: {0}")]
    UnknownMutation(u64),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type EngineResult<T> = StdResult<T, EngineError>;

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::Export(err.to_string())
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Per-record data-quality problem. Reported next to a successful result, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityWarning {
    pub record_id: String,
    pub field: String,
    pub reason: String,
}

impl DataQualityWarning {
    pub fn new(record_id: impl Into<String>, field: &str, reason: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.record_id, self.field, self.reason)
    }
}
