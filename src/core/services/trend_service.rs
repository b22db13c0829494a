use crate::domain::summary::{MonthBucketTotal, TrendInsight, TrendKind};
use crate::errors::{EngineError, EngineResult};
use crate::utils::round2;

/// Percent change above which the latest month counts as a spike.
pub const SPIKE_THRESHOLD: f64 = 20.0;
/// Percent change below which the latest month counts as an improvement.
pub const IMPROVEMENT_THRESHOLD: f64 = -20.0;

const MIN_BUCKETS: usize = 2;

pub struct TrendService;

impl TrendService {
    /// Compares the last bucket with the mean of all earlier buckets.
    pub fn analyze(month_totals: &[MonthBucketTotal]) -> EngineResult<TrendInsight> {
        let insufficient = || EngineError::InsufficientHistory {
            required: MIN_BUCKETS,
            actual: month_totals.len(),
        };
        if month_totals.len() < MIN_BUCKETS {
            return Err(insufficient());
        }
        let (current, history) = month_totals.split_last().ok_or_else(insufficient)?;

        let baseline =
            history.iter().map(|bucket| bucket.total).sum::<f64>() / history.len() as f64;
        if baseline == 0.0 {
            return Ok(TrendInsight {
                kind: TrendKind::None,
                delta_percent: 0.0,
                message: "Not enough earlier spending to compare against.".into(),
            });
        }

        // Classification uses the exact change; only the reported figure is rounded.
        let delta = (current.total - baseline) / baseline * 100.0;
        let delta_percent = round2(delta);
        let (kind, message) = if delta > SPIKE_THRESHOLD {
            (
                TrendKind::Spike,
                format!(
                    "Spending in {} is {:.1}% above your recent average.",
                    current.label, delta_percent
                ),
            )
        } else if delta < IMPROVEMENT_THRESHOLD {
            (
                TrendKind::Improvement,
                format!(
                    "Spending in {} is {:.1}% below your recent average.",
                    current.label,
                    delta_percent.abs()
                ),
            )
        } else {
            (
                TrendKind::None,
                format!("Spending in {} is in line with your recent average.", current.label),
            )
        };

        Ok(TrendInsight {
            kind,
            delta_percent,
            message,
        })
    }
}
