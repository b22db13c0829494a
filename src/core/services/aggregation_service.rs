//! Groups expense transactions by category and by calendar month.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::common::Amounted;
use crate::domain::summary::{CategoryTotal, MonthBucketTotal};
use crate::domain::transaction::Transaction;
use crate::errors::DataQualityWarning;
use crate::ledger::TimeWindow;
use crate::utils::round2;

pub const DEFAULT_TOP_N: usize = 5;

/// Output of one aggregation pass over a window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    /// Every category with spend, highest first. Never truncated.
    pub category_totals: Vec<CategoryTotal>,
    /// One entry per window bucket, in window order.
    pub month_totals: Vec<MonthBucketTotal>,
    pub warnings: Vec<DataQualityWarning>,
}

impl Aggregation {
    /// Leading `n` categories for chart-style views. Budget matching must use the full list.
    pub fn top_categories(&self, n: usize) -> &[CategoryTotal] {
        &self.category_totals[..n.min(self.category_totals.len())]
    }

    pub fn total_spent(&self) -> f64 {
        round2(self.month_totals.iter().map(|bucket| bucket.total).sum())
    }
}

/// Stateless aggregation over transaction snapshots.
pub struct AggregationService;

impl AggregationService {
    pub fn aggregate(transactions: &[Transaction], window: &TimeWindow) -> Aggregation {
        let mut category_acc: Vec<(String, f64)> = Vec::new();
        let mut category_index: HashMap<&str, usize> = HashMap::new();
        let mut month_acc = vec![0.0_f64; window.buckets.len()];
        let mut warnings = Vec::new();

        for txn in transactions.iter().filter(|txn| txn.is_expense()) {
            let Some(occurred_at) = txn.occurred_at() else {
                tracing::warn!(
                    id = %txn.id,
                    date = %txn.date,
                    "skipping transaction with unparsable date"
                );
                warnings.push(DataQualityWarning::new(
                    &txn.id,
                    "date",
                    format!("unparsable date `{}`", txn.date),
                ));
                continue;
            };
            if !window.contains(occurred_at) {
                continue;
            }

            let amount = txn.amount();
            let slot = *category_index
                .entry(txn.category.as_str())
                .or_insert_with(|| {
                    category_acc.push((txn.category.clone(), 0.0));
                    category_acc.len() - 1
                });
            category_acc[slot].1 += amount;
            if let Some(slot) = window.bucket_index(occurred_at) {
                month_acc[slot] += amount;
            }
        }

        // Stable: equal totals keep first-seen order.
        category_acc.sort_by(|a, b| b.1.total_cmp(&a.1));

        let category_totals = category_acc
            .into_iter()
            .map(|(name, total)| CategoryTotal {
                name,
                total: round2(total),
            })
            .collect();

        let month_totals = window
            .buckets
            .iter()
            .zip(month_acc)
            .map(|(bucket, total)| MonthBucketTotal {
                key: bucket.key.clone(),
                label: bucket.label.clone(),
                total: round2(total),
            })
            .collect();

        tracing::debug!(
            transactions = transactions.len(),
            skipped = warnings.len(),
            "aggregated transactions"
        );

        Aggregation {
            category_totals,
            month_totals,
            warnings,
        }
    }

    /// Same pass as [`AggregationService::aggregate`], with categories cut to `top_n`.
    pub fn aggregate_top(
        transactions: &[Transaction],
        window: &TimeWindow,
        top_n: usize,
    ) -> Aggregation {
        let mut aggregation = Self::aggregate(transactions, window);
        aggregation.category_totals.truncate(top_n);
        aggregation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::WindowService;
    use crate::domain::summary::total_of;
    use crate::ledger::{RangeSpec, RollingSpan};
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn year_window() -> TimeWindow {
        WindowService::resolve(&RangeSpec::Rolling(RollingSpan::OneYear), now()).unwrap()
    }

    #[test]
    fn single_expense_lands_in_first_bucket() {
        let txns = vec![Transaction::expense("t1", "Food", 120.0, "2024-04-10")];
        let agg = AggregationService::aggregate(&txns, &year_window());

        assert_eq!(agg.month_totals.len(), 12);
        assert_eq!(agg.month_totals[0].key, "2024-04");
        assert_eq!(agg.month_totals[0].total, 120.0);
        assert!(agg.month_totals[1..].iter().all(|bucket| bucket.total == 0.0));
        assert_eq!(
            agg.category_totals,
            vec![CategoryTotal {
                name: "Food".into(),
                total: 120.0
            }]
        );
    }

    #[test]
    fn income_and_out_of_window_records_are_ignored() {
        let txns = vec![
            Transaction::income("i1", "Salary", 3000.0, "2025-03-01"),
            Transaction::expense("old", "Food", 50.0, "2024-03-31"),
            Transaction::expense("future", "Food", 50.0, "2025-03-16"),
            Transaction::expense("ok", "Food", 10.0, "2025-03-15T12:00:00"),
        ];
        let agg = AggregationService::aggregate(&txns, &year_window());
        assert_eq!(agg.total_spent(), 10.0);
        assert_eq!(agg.category_totals.len(), 1);
    }

    #[test]
    fn categories_sort_descending_with_stable_ties() {
        let txns = vec![
            Transaction::expense("1", "Transport", 40.0, "2025-01-03"),
            Transaction::expense("2", "Food", 60.0, "2025-01-04"),
            Transaction::expense("3", "Fun", 40.0, "2025-02-04"),
            Transaction::expense("4", "food", 5.0, "2025-02-05"),
        ];
        let agg = AggregationService::aggregate(&txns, &year_window());
        let names: Vec<_> = agg.category_totals.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Food", "Transport", "Fun", "food"]);
    }

    #[test]
    fn unparsable_dates_are_skipped_with_warning() {
        let txns = vec![
            Transaction::expense("bad", "Food", 10.0, "not-a-date"),
            Transaction::expense("good", "Food", 15.0, "2025-02-01"),
        ];
        let agg = AggregationService::aggregate(&txns, &year_window());
        assert_eq!(agg.total_spent(), 15.0);
        assert_eq!(agg.warnings.len(), 1);
        assert_eq!(agg.warnings[0].record_id, "bad");
        assert_eq!(agg.warnings[0].field, "date");
    }

    #[test]
    fn month_and_category_groupings_agree() {
        let txns: Vec<_> = (0..40)
            .map(|i| {
                let category = ["Food", "Rent", "Fun", "Travel"][i % 4];
                let month = (i % 12) as u32 + 1;
                let year = if month <= 3 { 2025 } else { 2024 };
                Transaction::expense(
                    format!("t{i}"),
                    category,
                    10.25 * (i as f64 + 1.0),
                    format!("{year}-{month:02}-{:02}", i % 28 + 1),
                )
            })
            .collect();
        let agg = AggregationService::aggregate(&txns, &year_window());
        let by_month = round2(total_of(&agg.month_totals));
        let by_category = round2(total_of(&agg.category_totals));
        assert_eq!(by_month, by_category);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let txns = vec![
            Transaction::expense("1", "Food", 12.345, "2025-01-03"),
            Transaction::expense("2", "Rent", 800.0, "2025-02-01"),
        ];
        let window = year_window();
        let first = serde_json::to_string(&AggregationService::aggregate(&txns, &window)).unwrap();
        let second = serde_json::to_string(&AggregationService::aggregate(&txns, &window)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn top_view_truncates_but_full_view_does_not() {
        let txns: Vec<_> = (0..8)
            .map(|i| {
                let amount = 10.0 + i as f64;
                Transaction::expense(format!("t{i}"), format!("C{i}"), amount, "2025-02-01")
            })
            .collect();
        let window = year_window();
        let full = AggregationService::aggregate(&txns, &window);
        assert_eq!(full.category_totals.len(), 8);
        assert_eq!(full.top_categories(DEFAULT_TOP_N).len(), 5);
        assert_eq!(full.top_categories(20).len(), 8);

        let top = AggregationService::aggregate_top(&txns, &window, 3);
        let names: Vec<_> = top.category_totals.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C7", "C6", "C5"]);
        assert_eq!(top.month_totals, full.month_totals);
    }
}
