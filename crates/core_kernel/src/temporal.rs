//! Coverage periods
//!
//! A policy is valid over a closed window of instants. Claims carry an
//! incident *date*, so the period answers both instant and date questions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },
}

/// The validity window of a policy, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveragePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CoveragePeriod {
    /// Creates a new period; `start` must precede `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start >= end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Whether the instant falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Whether any part of the calendar date (UTC) overlaps the window.
    ///
    /// A policy that starts at 10:00 on the incident date still covers an
    /// incident reported for that date.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        date >= self.start.date_naive() && date <= self.end.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn year_2024() -> CoveragePeriod {
        CoveragePeriod::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_inverted_period() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let result = CoveragePeriod::new(start, start);
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_covers_date_inclusive_on_both_ends() {
        let period = year_2024();
        assert!(period.covers_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(period.covers_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!period.covers_date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
        assert!(!period.covers_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }

    #[test]
    fn test_contains_instant() {
        let period = year_2024();
        assert!(!period.contains(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
        assert!(period.contains(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
        assert!(!period.contains(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    }
}
