//! Long-run climate statistics built from segment-wise remote computations.
//!
//! - [`segments`]: day-weighted combination of contiguous date segments
//! - [`seasons`]: seasonal summaries from day-of-year filters
//! - [`sampler`]: seeded date sampling for Monte-Carlo estimates
//! - [`catalog`]: the concrete statistics, each memoized

pub mod catalog;
pub mod sampler;
pub mod seasons;
pub mod segments;

pub use catalog::{
    band_label, CatalogConfig, Computation, PrecipitationKind, StatOutput, StatisticContext, Unit,
    DEFAULT_RESOLUTION, TEN_MPH_IN_MPS,
};
pub use sampler::{fraction_above, sample_dates, sampled_fraction, sampled_values, DateSample, DEFAULT_SEED};
pub use seasons::{combine_seasons, month_filters, Season, SeasonScheme, SeasonalSummary};
pub use segments::{
    decade_boundaries, segments_from_boundaries, validate_span, weighted_average, weighted_mean, weighted_sum,
    yearly_boundaries, RasterSum, SegmentAggregator, Weighted,
};
