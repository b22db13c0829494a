#![allow(dead_code)]

use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use tally_core::config::ConfigManager;
use tally_core::domain::{
    normalize_budgets, normalize_transactions, CategoryBudget, Normalized, RawBudget,
    RawTransaction, Transaction,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Records shaped the way the storage collaborator returns them.
pub const RAW_TRANSACTIONS: &str = r#"[
    {"_id": "a1", "description": "Groceries", "category": {"name": "Food"}, "amount": -82.5,
     "date": "2025-03-02T10:15:00Z"},
    {"id": 2, "category": "Rent", "amount": "950", "date": "2025-03-01", "type": "expense"},
    {"id": "a3", "category": "Food", "amount": 41.25, "date": "2025-02-14", "kind": "expense"},
    {"id": "a4", "category": "Salary", "amount": 3200, "date": "2025-02-28", "type": "income"},
    {"id": "a5", "category": "Rent", "amount": 950, "date": "2025-02-01", "type": "expense"},
    {"id": "a6", "category": "Fun", "amount": "twelve", "date": "2025-01-20"},
    {"id": "a7", "amount": 30, "date": "2025-01-10"},
    {"id": "a8", "category": "Food", "amount": 60, "date": "yesterday"},
    {"id": "a9", "category": "Travel", "amount": 400, "date": "2024-09-30"},
    {"id": "a10", "category": "Food", "amount": 55.75, "date": "2024-12-24T18:30:00"}
]"#;

pub const RAW_BUDGETS: &str = r#"[
    {"categoryId": "c-food", "categoryName": "Food", "limit": 150,
     "periodMonth": 3, "periodYear": 2025},
    {"category_id": 7, "category": {"name": "Rent"}, "amount": "1000", "month": 3, "year": 2025},
    {"categoryId": "c-fun", "categoryName": "Fun", "limit": 50},
    {"categoryId": "c-food", "categoryName": "Food", "limit": 120,
     "periodMonth": 2, "periodYear": 2025}
]"#;

/// Reference instant every scenario is resolved against.
pub fn reference_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 15)
        .expect("valid date")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
}

pub fn load_transactions() -> Normalized<Transaction> {
    let raw: Vec<RawTransaction> =
        serde_json::from_str(RAW_TRANSACTIONS).expect("parse raw transactions");
    normalize_transactions(raw, reference_now())
}

pub fn load_budgets() -> Normalized<CategoryBudget> {
    let raw: Vec<RawBudget> = serde_json::from_str(RAW_BUDGETS).expect("parse raw budgets");
    normalize_budgets(raw)
}

/// Creates a config manager backed by a unique temporary directory.
pub fn setup_config_env() -> ConfigManager {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    ConfigManager::with_base_dir(base).expect("create config manager for temp dir")
}
