pub mod budget;
pub mod common;
pub mod raw;
pub mod summary;
pub mod transaction;

pub use budget::{
    BudgetOverview, BudgetReport, BudgetStatus, CategoryBudget, OverallBudget, OverallSource,
};
pub use common::{Amounted, Identifiable, NamedEntity};
pub use raw::{
    normalize_budgets, normalize_transactions, normalize_transactions_with_label, Normalized,
    RawBudget, RawTransaction,
};
pub use summary::{CategoryTotal, MonthBucketTotal, TrendInsight, TrendKind};
pub use transaction::{Transaction, TransactionDraft, TransactionKind, TransactionPatch};
