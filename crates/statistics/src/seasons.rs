//! Seasonal summaries from day-of-year calendar filters.
//!
//! A season list is a set of break dates inside one reference year. Adjacent
//! breaks become calendar filters applied to every year of the analysis
//! range. Winter wraps the year end, so its two pieces (start of year and
//! end of year) are combined by day-weighted mean.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use climate_common::{ClimateError, ClimateResult};
use tiling::CalendarFilter;

use crate::segments::{weighted_average, Weighted};

/// Non-leap reference year for break dates.
const REFERENCE_YEAR: i32 = 2021;

/// Which season convention a summary follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonScheme {
    /// Equinoxes and solstices.
    Astronomical,
    /// Whole months: DJF, MAM, JJA, SON.
    Meteorological,
}

impl SeasonScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Astronomical => "astro",
            Self::Meteorological => "season",
        }
    }

    /// Break dates in the reference year, first and last included.
    pub fn breaks(self) -> Vec<NaiveDate> {
        let dates: &[(u32, u32)] = match self {
            Self::Astronomical => &[(1, 1), (3, 20), (6, 21), (9, 22), (12, 21), (12, 31)],
            Self::Meteorological => &[(1, 1), (3, 1), (6, 1), (9, 1), (12, 1), (12, 31)],
        };
        dates
            .iter()
            .filter_map(|(m, d)| NaiveDate::from_ymd_opt(REFERENCE_YEAR, *m, *d))
            .collect()
    }

    /// Calendar filters for winter (early), spring, summer, fall, winter (late).
    pub fn filters(self) -> Vec<CalendarFilter> {
        filters_for_breaks(&self.breaks())
    }
}

/// The four seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

/// Calendar filters between consecutive day-of-year breaks.
pub fn filters_for_breaks(breaks: &[NaiveDate]) -> Vec<CalendarFilter> {
    breaks
        .windows(2)
        .map(|pair| CalendarFilter {
            start_day: pair[0].ordinal(),
            end_day: pair[1].ordinal(),
        })
        .collect()
}

/// One calendar filter per month of the reference year.
pub fn month_filters() -> Vec<CalendarFilter> {
    let starts: Vec<NaiveDate> = (1..=12)
        .filter_map(|m| NaiveDate::from_ymd_opt(REFERENCE_YEAR, m, 1))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end_day = match starts.get(i + 1) {
                Some(next) => next.ordinal() - 1,
                None => 365,
            };
            CalendarFilter {
                start_day: start.ordinal(),
                end_day,
            }
        })
        .collect()
}

/// Length of a filter used as its weight.
pub fn filter_weight(filter: &CalendarFilter) -> f64 {
    filter.end_day.saturating_sub(filter.start_day) as f64
}

/// Winter, spring, summer and fall values.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalSummary<V> {
    pub winter: V,
    pub spring: V,
    pub summer: V,
    pub fall: V,
}

impl<V> SeasonalSummary<V> {
    pub fn into_vec(self) -> Vec<(Season, V)> {
        vec![
            (Season::Winter, self.winter),
            (Season::Spring, self.spring),
            (Season::Summer, self.summer),
            (Season::Fall, self.fall),
        ]
    }
}

/// Fold the five per-filter values into a seasonal summary.
pub fn combine_seasons<V: Weighted>(
    filters: &[CalendarFilter],
    values: Vec<V>,
) -> ClimateResult<SeasonalSummary<V>> {
    if filters.len() != 5 || values.len() != 5 {
        return Err(ClimateError::Config(format!(
            "seasonal summary needs 5 filters and values, got {} and {}",
            filters.len(),
            values.len()
        )));
    }

    let mut values = values.into_iter();
    let (winter_1, spring, summer, fall, winter_2) = match (
        values.next(),
        values.next(),
        values.next(),
        values.next(),
        values.next(),
    ) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
        _ => return Err(ClimateError::Config("missing seasonal value".into())),
    };

    let winter = weighted_average([
        (filter_weight(&filters[0]), &winter_1),
        (filter_weight(&filters[4]), &winter_2),
    ])?;

    Ok(SeasonalSummary {
        winter,
        spring,
        summer,
        fall,
    })
}
