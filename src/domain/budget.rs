//! Budget limits and the adherence metrics derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::common::{find_by_name, NamedEntity};
use crate::utils::round2;

/// Spending limit for one category in one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBudget {
    pub category_id: String,
    pub category_name: String,
    pub limit: f64,
    pub period_month: u32,
    pub period_year: i32,
}

impl CategoryBudget {
    pub fn new(
        category_id: impl Into<String>,
        category_name: impl Into<String>,
        limit: f64,
        period_month: u32,
        period_year: i32,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: category_name.into(),
            limit: limit.max(0.0),
            period_month,
            period_year,
        }
    }

    /// Identity of a budget; two budgets sharing it are a caller error.
    pub fn key(&self) -> (&str, u32, i32) {
        (&self.category_id, self.period_month, self.period_year)
    }

    pub fn covers(&self, year: i32, month: u32) -> bool {
        self.period_year == year && self.period_month == month
    }
}

impl NamedEntity for CategoryBudget {
    fn name(&self) -> &str {
        &self.category_name
    }
}

/// Per-category comparison of spend against its limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub category_name: String,
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percentage_used: f64,
    pub over_budget: bool,
    /// `false` when the category had spend but no budget entry.
    pub budgeted: bool,
}

impl BudgetStatus {
    /// Derives remaining, percentage, and over-budget state from limit and spend.
    pub fn from_parts(
        category_name: impl Into<String>,
        limit: f64,
        spent: f64,
        budgeted: bool,
    ) -> Self {
        let metrics = Metrics::compute(limit, spent);
        Self {
            category_name: category_name.into(),
            limit: round2(limit),
            spent: round2(spent),
            remaining: metrics.remaining,
            percentage_used: metrics.percentage_used,
            over_budget: metrics.over_budget,
            budgeted,
        }
    }
}

impl NamedEntity for BudgetStatus {
    fn name(&self) -> &str {
        &self.category_name
    }
}

/// Where the overall totals came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallSource {
    Authoritative,
    Local,
}

impl fmt::Display for OverallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallSource::Authoritative => "authoritative",
            OverallSource::Local => "local",
        };
        f.write_str(label)
    }
}

/// Totals reported by the budgets collaborator for the current period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOverview {
    pub total_budget: f64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallBudget {
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    pub percentage_used: f64,
    pub over_budget: bool,
    pub source: OverallSource,
}

impl OverallBudget {
    pub fn from_parts(total_budget: f64, total_spent: f64, source: OverallSource) -> Self {
        let metrics = Metrics::compute(total_budget, total_spent);
        Self {
            total_budget: round2(total_budget),
            total_spent: round2(total_spent),
            total_remaining: metrics.remaining,
            percentage_used: metrics.percentage_used,
            over_budget: metrics.over_budget,
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetReport {
    /// Highest spender first.
    pub per_category: Vec<BudgetStatus>,
    pub overall: OverallBudget,
}

impl BudgetReport {
    pub fn over_budget(&self) -> impl Iterator<Item = &BudgetStatus> {
        self.per_category.iter().filter(|status| status.over_budget)
    }

    pub fn unbudgeted(&self) -> impl Iterator<Item = &BudgetStatus> {
        self.per_category.iter().filter(|status| !status.budgeted)
    }

    /// First status for `category_name`, i.e. the higher spender when names repeat.
    pub fn status(&self, category_name: &str) -> Option<&BudgetStatus> {
        find_by_name(&self.per_category, category_name)
    }
}

struct Metrics {
    remaining: f64,
    percentage_used: f64,
    over_budget: bool,
}

impl Metrics {
    /// Zero limits are informational: 0% used and never over budget.
    fn compute(limit: f64, spent: f64) -> Self {
        let has_limit = limit > 0.0;
        Self {
            remaining: round2((limit - spent).max(0.0)),
            percentage_used: if has_limit {
                round2(spent / limit * 100.0)
            } else {
                0.0
            },
            over_budget: has_limit && spent > limit,
        }
    }
}
