use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::services::aggregation_service::DEFAULT_TOP_N;
use crate::domain::raw::UNCATEGORIZED;
use crate::ledger::RangeSpec;

/// Tunables shared by the summary pipeline and the mutation coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_top_n")]
    pub top_n: usize,
    #[serde(default = "EngineConfig::default_range_value")]
    pub default_range: String,
    #[serde(default = "EngineConfig::default_mutation_timeout_ms")]
    pub mutation_timeout_ms: u64,
    #[serde(default = "EngineConfig::default_uncategorized_label")]
    pub uncategorized_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: Self::default_top_n(),
            default_range: Self::default_range_value(),
            mutation_timeout_ms: Self::default_mutation_timeout_ms(),
            uncategorized_label: Self::default_uncategorized_label(),
        }
    }
}

impl EngineConfig {
    pub fn default_top_n() -> usize {
        DEFAULT_TOP_N
    }

    pub fn default_range_value() -> String {
        "6months".into()
    }

    pub fn default_mutation_timeout_ms() -> u64 {
        10_000
    }

    pub fn default_uncategorized_label() -> String {
        UNCATEGORIZED.into()
    }

    /// Parses `default_range` into a range specifier.
    pub fn range(&self) -> Result<RangeSpec, ConfigError> {
        self.default_range
            .parse()
            .map_err(|err: crate::errors::EngineError| ConfigError::Invalid {
                field: "defaultRange",
                reason: err.to_string(),
            })
    }

    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_millis(self.mutation_timeout_ms)
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid {
                field: "topN",
                reason: "must be at least 1".into(),
            });
        }
        if self.uncategorized_label.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "uncategorizedLabel",
                reason: "must not be blank".into(),
            });
        }
        self.range().map(|_| ())
    }
}
