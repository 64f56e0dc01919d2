//! Day-weighted combination of per-segment statistics.
//!
//! Long ranges are split into contiguous segments (decades, years), each
//! segment is computed independently, and the results are combined with
//! weights proportional to segment length in days. The weighted mean of the
//! segment means equals the mean over the whole range.

use std::future::Future;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use climate_common::{ClimateError, ClimateResult, DateRange, DateSegment, Raster};

/// A value that can be combined by weighted sums: scalars and rasters.
///
/// Totals are accumulated in `f64` and converted back once, so long
/// multi-decade sums do not pick up `f32` rounding at every step.
pub trait Weighted: Sized {
    /// Running `Σ(v·w)`.
    type Sum;

    /// Start a total with `self * weight`.
    fn start_sum(&self, weight: f64) -> Self::Sum;

    /// Add `self * weight` to `sum`, element-wise for rasters.
    fn add_to(&self, sum: &mut Self::Sum, weight: f64) -> ClimateResult<()>;

    /// `sum / divisor`, converted back to a value.
    fn finish(sum: Self::Sum, divisor: f64) -> Self;
}

impl Weighted for f64 {
    type Sum = f64;

    fn start_sum(&self, weight: f64) -> f64 {
        self * weight
    }

    fn add_to(&self, sum: &mut f64, weight: f64) -> ClimateResult<()> {
        *sum += self * weight;
        Ok(())
    }

    fn finish(sum: f64, divisor: f64) -> Self {
        sum / divisor
    }
}

/// Double-precision running total of equally-shaped rasters.
#[derive(Debug, Clone)]
pub struct RasterSum {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl Weighted for Raster {
    type Sum = RasterSum;

    fn start_sum(&self, weight: f64) -> RasterSum {
        RasterSum {
            data: self.data.iter().map(|v| *v as f64 * weight).collect(),
            width: self.width,
            height: self.height,
        }
    }

    fn add_to(&self, sum: &mut RasterSum, weight: f64) -> ClimateResult<()> {
        if self.shape() != (sum.height, sum.width) {
            return Err(ClimateError::FatalInvariant(format!(
                "cannot combine {:?} raster with {:?} raster",
                (sum.height, sum.width),
                self.shape()
            )));
        }
        for (acc, v) in sum.data.iter_mut().zip(&self.data) {
            *acc += *v as f64 * weight;
        }
        Ok(())
    }

    fn finish(sum: RasterSum, divisor: f64) -> Self {
        Raster {
            data: sum.data.into_iter().map(|v| (v / divisor) as f32).collect(),
            width: sum.width,
            height: sum.height,
        }
    }
}

/// `Σ(v·w) / Σ(w)` over `(weight, value)` pairs.
pub fn weighted_average<'a, V: Weighted + 'a>(items: impl IntoIterator<Item = (f64, &'a V)>) -> ClimateResult<V> {
    let items: Vec<(f64, &V)> = items.into_iter().collect();
    let total: f64 = items.iter().map(|(w, _)| w).sum();
    if items.is_empty() || total <= 0.0 {
        return Err(ClimateError::Config("weighted average needs positive total weight".into()));
    }

    let (first_weight, first) = items[0];
    let mut sum = first.start_sum(first_weight);
    for (weight, value) in &items[1..] {
        value.add_to(&mut sum, *weight)?;
    }
    Ok(V::finish(sum, total))
}

/// Day-weighted mean of `(segment, value)` pairs.
///
/// Segments must be contiguous; see [`SegmentAggregator::aggregate`] for the
/// variant that also checks coverage of a range.
pub fn weighted_mean<V: Weighted>(segments: &[(DateSegment, V)]) -> ClimateResult<V> {
    let spans: Vec<DateSegment> = segments.iter().map(|(s, _)| *s).collect();
    check_contiguous(&spans)?;

    weighted_average(segments.iter().map(|(s, v)| (s.weight_days() as f64, v)))
}

/// Plain sum of contiguous segment values, for additive statistics.
pub fn weighted_sum<V: Weighted>(segments: &[(DateSegment, V)]) -> ClimateResult<V> {
    let spans: Vec<DateSegment> = segments.iter().map(|(s, _)| *s).collect();
    check_contiguous(&spans)?;

    let mut sum = segments[0].1.start_sum(1.0);
    for (_, value) in &segments[1..] {
        value.add_to(&mut sum, 1.0)?;
    }
    Ok(V::finish(sum, 1.0))
}

fn check_contiguous(spans: &[DateSegment]) -> ClimateResult<()> {
    if spans.is_empty() {
        return Err(ClimateError::Config("no segments to combine".into()));
    }
    for pair in spans.windows(2) {
        if pair[0].end != pair[1].start {
            return Err(ClimateError::Config(format!(
                "segments {} and {} are not contiguous",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

/// Check that `spans` tile `range` exactly: contiguous, non-overlapping,
/// starting at the range start and ending at its exclusive end.
pub fn validate_span(range: &DateRange, spans: &[DateSegment]) -> ClimateResult<()> {
    check_contiguous(spans)?;

    let first = spans[0];
    let last = spans[spans.len() - 1];
    if first.start != range.start || last.end != range.exclusive_end() {
        return Err(ClimateError::Config(format!(
            "segments {}..{} do not span {}",
            first.start,
            last.end,
            range
        )));
    }
    Ok(())
}

/// Turn an ordered boundary list into half-open segments.
pub fn segments_from_boundaries(boundaries: &[NaiveDate]) -> ClimateResult<Vec<DateSegment>> {
    if boundaries.len() < 2 {
        return Err(ClimateError::Config(format!(
            "need at least two boundaries, got {}",
            boundaries.len()
        )));
    }
    boundaries
        .windows(2)
        .map(|pair| DateSegment::new(pair[0], pair[1]))
        .collect()
}

/// Range start, every January 1st inside the range whose year satisfies
/// `keep`, then the exclusive end.
fn year_boundaries(range: &DateRange, keep: impl Fn(i32) -> bool) -> Vec<NaiveDate> {
    let end = range.exclusive_end();
    let mut boundaries = vec![range.start];
    for year in (range.start.year() + 1)..=end.year() {
        if !keep(year) {
            continue;
        }
        if let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) {
            if jan1 > range.start && jan1 < end {
                boundaries.push(jan1);
            }
        }
    }
    boundaries.push(end);
    boundaries
}

/// Boundaries at each decade start, e.g. 1990, 2000, 2010, 2020 for the
/// default range.
pub fn decade_boundaries(range: &DateRange) -> Vec<NaiveDate> {
    year_boundaries(range, |year| year % 10 == 0)
}

/// Boundaries at each January 1st.
pub fn yearly_boundaries(range: &DateRange) -> Vec<NaiveDate> {
    year_boundaries(range, |_| true)
}

/// Combines per-segment results over a fixed analysis range.
#[derive(Debug, Clone, Copy)]
pub struct SegmentAggregator {
    range: DateRange,
}

impl SegmentAggregator {
    pub fn new(range: DateRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn decade_segments(&self) -> ClimateResult<Vec<DateSegment>> {
        segments_from_boundaries(&decade_boundaries(&self.range))
    }

    pub fn yearly_segments(&self) -> ClimateResult<Vec<DateSegment>> {
        segments_from_boundaries(&yearly_boundaries(&self.range))
    }

    /// Day-weighted mean of segment values spanning the range.
    pub fn aggregate<V: Weighted>(&self, segments: &[(DateSegment, V)]) -> ClimateResult<V> {
        let spans: Vec<DateSegment> = segments.iter().map(|(s, _)| *s).collect();
        validate_span(&self.range, &spans)?;
        weighted_mean(segments)
    }

    /// Sum of segment values spanning the range.
    pub fn sum<V: Weighted>(&self, segments: &[(DateSegment, V)]) -> ClimateResult<V> {
        let spans: Vec<DateSegment> = segments.iter().map(|(s, _)| *s).collect();
        validate_span(&self.range, &spans)?;
        weighted_sum(segments)
    }

    /// Compute every segment with `compute`, then take the day-weighted mean.
    ///
    /// The first failing segment aborts the aggregation.
    pub async fn aggregate_with<V, F, Fut>(&self, spans: &[DateSegment], compute: F) -> ClimateResult<V>
    where
        V: Weighted,
        F: FnMut(DateSegment) -> Fut,
        Fut: Future<Output = ClimateResult<V>>,
    {
        let segments = self.collect(spans, compute).await?;
        self.aggregate(&segments)
    }

    /// Compute every segment with `compute`, then sum.
    pub async fn sum_with<V, F, Fut>(&self, spans: &[DateSegment], compute: F) -> ClimateResult<V>
    where
        V: Weighted,
        F: FnMut(DateSegment) -> Fut,
        Fut: Future<Output = ClimateResult<V>>,
    {
        let segments = self.collect(spans, compute).await?;
        self.sum(&segments)
    }

    async fn collect<V, F, Fut>(&self, spans: &[DateSegment], mut compute: F) -> ClimateResult<Vec<(DateSegment, V)>>
    where
        F: FnMut(DateSegment) -> Fut,
        Fut: Future<Output = ClimateResult<V>>,
    {
        // fail before any remote work if the boundaries are wrong
        validate_span(&self.range, spans)?;

        let mut segments = Vec::with_capacity(spans.len());
        for (i, span) in spans.iter().enumerate() {
            let value = compute(*span).await?;
            debug!(segment = %span, progress = format!("{}/{}", i + 1, spans.len()), "Segment computed");
            segments.push((*span, value));
        }
        Ok(segments)
    }
}
