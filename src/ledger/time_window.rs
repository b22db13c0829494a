//! Range specifiers, resolved windows, and calendar-month arithmetic.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar-aligned windows ending at "now".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresetRange {
    Week,
    Month,
    Quarter,
    Year,
}

/// Windows covering a fixed number of calendar months up to "now".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RollingSpan {
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
}

impl RollingSpan {
    pub fn months(self) -> u32 {
        match self {
            RollingSpan::ThreeMonths => 3,
            RollingSpan::SixMonths => 6,
            RollingSpan::OneYear => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RangeSpec {
    Preset(PresetRange),
    Rolling(RollingSpan),
    Custom {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl RangeSpec {
    pub fn custom(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        RangeSpec::Custom {
            start_date,
            end_date,
        }
    }
}

impl FromStr for RangeSpec {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let spec = match value.trim().to_ascii_lowercase().as_str() {
            "week" => RangeSpec::Preset(PresetRange::Week),
            "month" => RangeSpec::Preset(PresetRange::Month),
            "quarter" => RangeSpec::Preset(PresetRange::Quarter),
            "year" => RangeSpec::Preset(PresetRange::Year),
            "3months" => RangeSpec::Rolling(RollingSpan::ThreeMonths),
            "6months" => RangeSpec::Rolling(RollingSpan::SixMonths),
            "1year" => RangeSpec::Rolling(RollingSpan::OneYear),
            other => {
                return Err(EngineError::InvalidRange(format!(
                    "unknown range specifier `{other}`"
                )))
            }
        };
        Ok(spec)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::Preset(PresetRange::Week) => f.write_str("week"),
            RangeSpec::Preset(PresetRange::Month) => f.write_str("month"),
            RangeSpec::Preset(PresetRange::Quarter) => f.write_str("quarter"),
            RangeSpec::Preset(PresetRange::Year) => f.write_str("year"),
            RangeSpec::Rolling(RollingSpan::ThreeMonths) => f.write_str("3months"),
            RangeSpec::Rolling(RollingSpan::SixMonths) => f.write_str("6months"),
            RangeSpec::Rolling(RollingSpan::OneYear) => f.write_str("1year"),
            RangeSpec::Custom {
                start_date,
                end_date,
            } => write!(f, "{start_date}..{end_date}"),
        }
    }
}

/// One calendar month of a resolved window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub key: String,
    /// `Mon YYYY`
    pub label: String,
}

impl MonthBucket {
    pub fn for_month(year: i32, month: u32) -> Self {
        let abbreviation = MONTH_ABBREVIATIONS
            .get(month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        Self {
            key: month_key(year, month),
            label: format!("{abbreviation} {year}"),
        }
    }
}

/// Inclusive `[start, end]` instants plus the months they touch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub buckets: Vec<MonthBucket>,
}

impl TimeWindow {
    /// Builds a window and its bucket list. Fails when `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self {
            start,
            end,
            buckets: month_buckets(start.date(), end.date()),
        })
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    pub fn bucket_index(&self, instant: NaiveDateTime) -> Option<usize> {
        let key = month_key(instant.year(), instant.month());
        self.buckets.iter().position(|bucket| bucket.key == key)
    }
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// One bucket per calendar month from the month of `start` through the month of `end`.
pub fn month_buckets(start: NaiveDate, end: NaiveDate) -> Vec<MonthBucket> {
    let mut buckets = Vec::new();
    let mut cursor = first_of_month(start);
    let last = first_of_month(end);
    while cursor <= last {
        buckets.push(MonthBucket::for_month(cursor.year(), cursor.month()));
        cursor = shift_month(cursor, 1);
    }
    buckets
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the calendar quarter containing `date`.
pub fn first_of_quarter(date: NaiveDate) -> NaiveDate {
    align_month_to_interval(first_of_month(date), 3)
}

pub fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let last_millisecond = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    date.and_time(last_millisecond)
}

/// Moves `date` by whole months, clamping the day to the target month's length.
pub fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn align_month_to_interval(date: NaiveDate, interval: u32) -> NaiveDate {
    let month_index = date.month0();
    let block = (month_index / interval) * interval;
    NaiveDate::from_ymd_opt(date.year(), block + 1, 1).unwrap_or(date)
}
