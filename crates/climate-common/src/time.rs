//! Date handling for multi-decade statistics.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClimateError, ClimateResult};

/// Date format used in cache keys, configs and service requests.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> ClimateResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| ClimateError::Config(format!("invalid date '{}': {}", s, e)))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The configured analysis range. Both ends are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClimateResult<Self> {
        if end < start {
            return Err(ClimateError::Config(format!(
                "date range end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> ClimateResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// One calendar day past the final included day.
    pub fn exclusive_end(&self) -> NaiveDate {
        self.end + Duration::days(1)
    }

    /// Number of days in the range, both ends included.
    pub fn num_days(&self) -> usize {
        (self.exclusive_end() - self.start).num_days() as usize
    }

    /// The date `offset` days after the start.
    pub fn nth_day(&self, offset: usize) -> NaiveDate {
        self.start + Duration::days(offset as i64)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// The whole range as one half-open segment.
    pub fn as_segment(&self) -> DateSegment {
        DateSegment {
            start: self.start,
            end: self.exclusive_end(),
        }
    }
}

impl Default for DateRange {
    /// 1990-01-01 through 2019-12-31.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap_or_default(),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", format_date(self.start), format_date(self.end))
    }
}

/// A half-open `[start, end)` span of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSegment {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSegment {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClimateResult<Self> {
        if end <= start {
            return Err(ClimateError::Config(format!(
                "segment [{}, {}) is empty",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Segment length in days.
    pub fn weight_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl fmt::Display for DateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", format_date(self.start), format_date(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let d = parse_date("2019-12-31").unwrap();
        assert_eq!(format_date(d), "2019-12-31");
        assert!(parse_date("2019-13-01").is_err());
    }

    #[test]
    fn test_default_range_matches_decades() {
        let range = DateRange::default();
        assert_eq!(format_date(range.exclusive_end()), "2020-01-01");
        assert_eq!(range.num_days(), 10957);
    }

    #[test]
    fn test_segment_weight() {
        let seg = DateSegment::new(parse_date("2021-01-01").unwrap(), parse_date("2021-02-01").unwrap()).unwrap();
        assert_eq!(seg.weight_days(), 31);
        assert!(seg.contains(parse_date("2021-01-31").unwrap()));
        assert!(!seg.contains(parse_date("2021-02-01").unwrap()));
    }

    #[test]
    fn test_empty_segment_rejected() {
        let d = parse_date("2021-01-01").unwrap();
        assert!(DateSegment::new(d, d).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::parse("2020-01-01", "2019-01-01").is_err());
    }
}
