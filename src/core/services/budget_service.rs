//! Provides budget adherence metrics by merging limits with aggregated spend.

use std::collections::HashSet;

use crate::domain::budget::{
    BudgetOverview, BudgetReport, BudgetStatus, CategoryBudget, OverallBudget, OverallSource,
};
use crate::domain::common::{index_by_name, Amounted, NamedEntity};
use crate::domain::summary::{total_of, CategoryTotal};
use crate::errors::{EngineError, EngineResult};

/// Stateless budgeting utilities that operate over aggregated category totals.
pub struct BudgetService;

impl BudgetService {
    /// Fails on the first repeated `(category, month, year)` key.
    pub fn validate(budgets: &[CategoryBudget]) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for budget in budgets {
            if !seen.insert(budget.key()) {
                return Err(EngineError::DuplicateBudgetKey {
                    category_id: budget.category_id.clone(),
                    month: budget.period_month,
                    year: budget.period_year,
                });
            }
        }
        Ok(())
    }

    /// Budgets belonging to one calendar month, in input order.
    pub fn budgets_for_period(
        budgets: &[CategoryBudget],
        year: i32,
        month: u32,
    ) -> Vec<CategoryBudget> {
        budgets
            .iter()
            .filter(|budget| budget.covers(year, month))
            .cloned()
            .collect()
    }

    /// Compares the full category spend list with the period's budgets.
    ///
    /// `category_totals` must be the untruncated list; matching against a top-N
    /// view would hide over-budget categories ranked below the cut.
    /// The collaborator's `authoritative` totals win over local sums when present.
    pub fn track(
        category_totals: &[CategoryTotal],
        budgets: &[CategoryBudget],
        authoritative: Option<BudgetOverview>,
    ) -> EngineResult<BudgetReport> {
        Self::validate(budgets)?;

        let spend_by_name = index_by_name(category_totals);

        // Two budget ids can share a display name; their limits then share one spend figure.
        let mut per_category: Vec<BudgetStatus> = budgets
            .iter()
            .map(|budget| {
                let spent = spend_by_name
                    .get(budget.name())
                    .map_or(0.0, |entry| entry.amount());
                BudgetStatus::from_parts(budget.name(), budget.limit, spent, true)
            })
            .collect();

        let budgeted_names = index_by_name(budgets);
        per_category.extend(
            category_totals
                .iter()
                .filter(|entry| !budgeted_names.contains_key(entry.name()))
                .map(|entry| BudgetStatus::from_parts(entry.name(), 0.0, entry.amount(), false)),
        );

        per_category.sort_by(|a, b| b.spent.total_cmp(&a.spent));

        let overall = match authoritative {
            Some(overview) => OverallBudget::from_parts(
                overview.total_budget,
                overview.total_spent,
                OverallSource::Authoritative,
            ),
            None => {
                let total_budget: f64 = budgets.iter().map(|budget| budget.limit).sum();
                let total_spent = total_of(category_totals);
                OverallBudget::from_parts(total_budget, total_spent, OverallSource::Local)
            }
        };

        let over = per_category.iter().filter(|status| status.over_budget).count();
        if over > 0 {
            tracing::debug!(categories = over, "categories over budget");
        }

        Ok(BudgetReport {
            per_category,
            overall,
        })
    }
}
