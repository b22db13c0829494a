//! Runs the full aggregation pipeline for one dashboard view.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::mutation::WorkingSet;
use crate::core::services::{
    AggregationService, BudgetService, ExportService, ReportTable, TrendService, WindowService,
};
use crate::domain::budget::{BudgetOverview, BudgetReport, CategoryBudget};
use crate::domain::summary::{CategoryTotal, TrendInsight};
use crate::domain::transaction::Transaction;
use crate::errors::{DataQualityWarning, EngineResult};
use crate::ledger::{RangeSpec, TimeWindow};

use super::aggregation_service::{Aggregation, DEFAULT_TOP_N};

/// Everything besides the transactions that shapes a summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOptions {
    pub range: RangeSpec,
    pub now: NaiveDateTime,
    pub top_n: usize,
    /// Budgets of the period being tracked.
    pub budgets: Vec<CategoryBudget>,
    /// Totals reported by the storage collaborator, when it has them.
    pub authoritative: Option<BudgetOverview>,
}

impl SummaryOptions {
    pub fn new(range: RangeSpec, now: NaiveDateTime) -> Self {
        Self {
            range,
            now,
            top_n: DEFAULT_TOP_N,
            budgets: Vec::new(),
            authoritative: None,
        }
    }

    /// Options built from the configured default range and top-N size.
    pub fn from_config(config: &EngineConfig, now: NaiveDateTime) -> EngineResult<Self> {
        let mut options = Self::new(config.range()?, now);
        options.top_n = config.top_n;
        Ok(options)
    }

    pub fn with_budgets(mut self, budgets: Vec<CategoryBudget>) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn with_authoritative(mut self, overview: BudgetOverview) -> Self {
        self.authoritative = Some(overview);
        self
    }
}

pub struct SummaryRequest<'a> {
    pub transactions: &'a [Transaction],
    pub options: &'a SummaryOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub window: TimeWindow,
    pub top_categories: Vec<CategoryTotal>,
    pub aggregation: Aggregation,
    pub budget: BudgetReport,
    /// Absent when the window has a single bucket.
    pub trend: Option<TrendInsight>,
    pub report: ReportTable,
}

impl DashboardSummary {
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.aggregation.warnings
    }
}

pub struct SummaryService;

impl SummaryService {
    pub fn summarize(request: &SummaryRequest<'_>) -> EngineResult<DashboardSummary> {
        let options = request.options;
        let window = WindowService::resolve(&options.range, options.now)?;
        BudgetService::validate(&options.budgets)?;

        let aggregation = AggregationService::aggregate(request.transactions, &window);
        let budget = BudgetService::track(
            &aggregation.category_totals,
            &options.budgets,
            options.authoritative,
        )?;
        let trend = if window.buckets.len() >= 2 {
            Some(TrendService::analyze(&aggregation.month_totals)?)
        } else {
            None
        };
        let report = ExportService::build(
            &aggregation.month_totals,
            &aggregation.category_totals,
            &budget.overall,
        );

        Ok(DashboardSummary {
            top_categories: aggregation.top_categories(options.top_n).to_vec(),
            window,
            aggregation,
            budget,
            trend,
            report,
        })
    }
}

/// Memoizes the last summary per working-set version and options.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entry: Option<CachedSummary>,
}

#[derive(Debug)]
struct CachedSummary {
    version: u64,
    options: SummaryOptions,
    summary: DashboardSummary,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        set: &WorkingSet,
        options: &SummaryOptions,
    ) -> EngineResult<&DashboardSummary> {
        let cached = match self.entry.take() {
            Some(cached) if cached.version == set.version() && cached.options == *options => {
                cached
            }
            _ => {
                let summary = SummaryService::summarize(&SummaryRequest {
                    transactions: set.transactions(),
                    options,
                })?;
                tracing::debug!(version = set.version(), "recomputed summary");
                CachedSummary {
                    version: set.version(),
                    options: options.clone(),
                    summary,
                }
            }
        };
        Ok(&self.entry.insert(cached).summary)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
