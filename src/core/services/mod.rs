pub mod aggregation_service;
pub mod budget_service;
pub mod export_service;
pub mod summary_service;
pub mod trend_service;
pub mod window_service;

pub use aggregation_service::{Aggregation, AggregationService, DEFAULT_TOP_N};
pub use budget_service::BudgetService;
pub use export_service::{ExportService, ParsedReport, ReportSummary, ReportTable};
pub use summary_service::{
    DashboardSummary, SummaryCache, SummaryOptions, SummaryRequest, SummaryService,
};
pub use trend_service::TrendService;
pub use window_service::WindowService;
