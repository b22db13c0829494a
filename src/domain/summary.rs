//! Aggregated outputs handed to the presentation layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::common::{Amounted, NamedEntity};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

impl NamedEntity for CategoryTotal {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Amounted for CategoryTotal {
    fn amount(&self) -> f64 {
        self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthBucketTotal {
    /// `YYYY-MM`
    pub key: String,
    pub label: String,
    pub total: f64,
}

impl Amounted for MonthBucketTotal {
    fn amount(&self) -> f64 {
        self.total
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    Spike,
    Improvement,
    None,
}

impl fmt::Display for TrendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendKind::Spike => "spike",
            TrendKind::Improvement => "improvement",
            TrendKind::None => "none",
        };
        f.write_str(label)
    }
}

/// Latest bucket compared with the mean of the buckets before it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendInsight {
    pub kind: TrendKind,
    pub delta_percent: f64,
    pub message: String,
}

/// Sums any amounted values, e.g. to check that two groupings agree.
pub fn total_of<T: Amounted>(items: &[T]) -> f64 {
    items.iter().map(Amounted::amount).sum()
}
