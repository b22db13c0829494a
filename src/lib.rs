#![doc(test(attr(deny(warnings))))]

//! Tally Core turns raw transaction records and per-category budget limits into
//! time-bucketed summaries, budget adherence metrics, trend insights, and
//! exportable reports, and keeps those views consistent while transactions are
//! optimistically added, edited, or deleted.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod utils;

use std::sync::Once;

pub use errors::{DataQualityWarning, EngineError, EngineResult};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Tally Core tracing initialized.");
    });
}
