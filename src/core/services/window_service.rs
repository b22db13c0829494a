//! Resolves range specifiers into concrete windows.

use chrono::{Duration, NaiveDateTime};

use crate::core::time::Clock;
use crate::errors::{EngineError, EngineResult};
use crate::ledger::time_window::{
    end_of_day, first_of_month, first_of_quarter, first_of_year, shift_month, start_of_day,
};
use crate::ledger::{PresetRange, RangeSpec, RollingSpan, TimeWindow};

pub struct WindowService;

impl WindowService {
    /// Resolves `spec` against the current time of `clock`.
    pub fn resolve_with_clock(spec: &RangeSpec, clock: &dyn Clock) -> EngineResult<TimeWindow> {
        Self::resolve(spec, clock.now_naive())
    }

    /// Resolves `spec` against an explicit reference instant.
    ///
    /// Preset and rolling windows end at `now`. Custom ranges are normalized to
    /// whole days and must not start or end on a later calendar day than `now`.
    pub fn resolve(spec: &RangeSpec, now: NaiveDateTime) -> EngineResult<TimeWindow> {
        let (start, end) = match *spec {
            RangeSpec::Preset(preset) => (Self::preset_start(preset, now), now),
            RangeSpec::Rolling(span) => (Self::rolling_start(span, now), now),
            RangeSpec::Custom {
                start_date,
                end_date,
            } => {
                let start = start_of_day(start_date);
                let end = end_of_day(end_date);
                if start > end {
                    return Err(EngineError::InvalidRange(format!(
                        "start {start_date} is after end {end_date}"
                    )));
                }
                // Compared by calendar day so a range ending today stays valid.
                for (day, bound) in [(start_date, start), (end_date, end)] {
                    if day > now.date() {
                        return Err(EngineError::FutureDateRejected { date: bound, now });
                    }
                }
                (start, end)
            }
        };

        let window = TimeWindow::new(start, end)?;
        tracing::debug!(
            range = %spec,
            start = %window.start,
            end = %window.end,
            buckets = window.buckets.len(),
            "resolved time window"
        );
        Ok(window)
    }

    fn preset_start(preset: PresetRange, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        match preset {
            PresetRange::Week => now - Duration::days(7),
            PresetRange::Month => start_of_day(first_of_month(today)),
            PresetRange::Quarter => start_of_day(first_of_quarter(today)),
            PresetRange::Year => start_of_day(first_of_year(today)),
        }
    }

    fn rolling_start(span: RollingSpan, now: NaiveDateTime) -> NaiveDateTime {
        let back = span.months() as i32 - 1;
        start_of_day(shift_month(first_of_month(now.date()), -back))
    }
}
