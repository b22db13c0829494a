//! Calendar windows and month buckets used to slice transaction history.

pub mod time_window;

pub use time_window::{MonthBucket, PresetRange, RangeSpec, RollingSpan, TimeWindow};
