//! Seeded date sampling for Monte-Carlo estimates.
//!
//! The sample is a full permutation of the range's days, fixed by the seed
//! and the range length. Taking the first `k` dates therefore always yields
//! the same dates, and a larger `k` extends a smaller one.
//!
//! Samples feed permanent cache entries, so the generator is ChaCha8 from
//! `rand_chacha`, whose output stream is fixed across releases.

use std::future::Future;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use climate_common::{ClimateError, ClimateResult, DateRange, Raster};

/// Seed used for every statistic in the catalogue.
pub const DEFAULT_SEED: u64 = 0;

/// A deterministic shuffled order of the days of a range.
#[derive(Debug, Clone)]
pub struct DateSample {
    range: DateRange,
    order: Vec<usize>,
}

impl DateSample {
    pub fn new(range: DateRange, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..range.num_days()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        order.shuffle(&mut rng);
        Self { range, order }
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All sampled dates, in sample order.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.order.iter().map(|offset| self.range.nth_day(*offset))
    }

    /// The first `k` sampled dates.
    pub fn take(&self, k: usize) -> ClimateResult<Vec<NaiveDate>> {
        if k > self.order.len() {
            return Err(ClimateError::Config(format!(
                "cannot sample {} dates from {} ({} days)",
                k,
                self.range,
                self.order.len()
            )));
        }
        Ok(self.iter().take(k).collect())
    }
}

/// Every day from `start` to `end` inclusive, in seeded random order.
pub fn sample_dates(start: NaiveDate, end: NaiveDate, seed: u64) -> ClimateResult<Vec<NaiveDate>> {
    let range = DateRange::new(start, end)?;
    Ok(DateSample::new(range, seed).iter().collect())
}

/// Evaluate `f` on the first `k` sampled dates, in sample order.
pub async fn sampled_values<V, F, Fut>(sample: &DateSample, k: usize, mut f: F) -> ClimateResult<Vec<V>>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ClimateResult<V>>,
{
    let dates = sample.take(k)?;
    let mut values = Vec::with_capacity(k);
    for (i, date) in dates.into_iter().enumerate() {
        debug!(date = %date, progress = format!("{}/{}", i + 1, k), "Processing sampled date");
        values.push(f(date).await?);
    }
    Ok(values)
}

/// Element-wise fraction of rasters strictly above `threshold`.
pub fn fraction_above(rasters: &[Raster], threshold: f32) -> ClimateResult<Raster> {
    let first = rasters
        .first()
        .ok_or_else(|| ClimateError::Config("no rasters to count".into()))?;

    let mut counts = vec![0u32; first.len()];
    for raster in rasters {
        if raster.shape() != first.shape() {
            return Err(ClimateError::FatalInvariant(format!(
                "sampled raster {:?} does not match {:?}",
                raster.shape(),
                first.shape()
            )));
        }
        for (count, value) in counts.iter_mut().zip(&raster.data) {
            if *value > threshold {
                *count += 1;
            }
        }
    }

    let n = rasters.len() as f32;
    Raster::new(counts.into_iter().map(|c| c as f32 / n).collect(), first.width, first.height)
}

/// Fraction of the first `k` sampled dates on which `f` exceeds `threshold`.
pub async fn sampled_fraction<F, Fut>(sample: &DateSample, k: usize, threshold: f32, f: F) -> ClimateResult<Raster>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ClimateResult<Raster>>,
{
    let rasters = sampled_values(sample, k, f).await?;
    fraction_above(&rasters, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn range() -> DateRange {
        DateRange::parse("2000-01-01", "2000-12-31").unwrap()
    }

    #[test]
    fn test_sample_is_permutation() {
        let dates = sample_dates(range().start, range().end, DEFAULT_SEED).unwrap();
        assert_eq!(dates.len(), 366);
        let unique: HashSet<_> = dates.iter().collect();
        assert_eq!(unique.len(), 366);
        assert!(dates.iter().all(|d| range().contains(*d)));
    }

    #[test]
    fn test_prefix_stability() {
        let sample = DateSample::new(range(), 7);
        let small = sample.take(10).unwrap();
        let large = DateSample::new(range(), 7).take(100).unwrap();
        assert_eq!(small[..], large[..10]);
    }

    #[test]
    fn test_seed_zero_order_is_pinned() {
        let sample = DateSample::new(range(), DEFAULT_SEED);
        let offsets: Vec<i64> = sample
            .take(5)
            .unwrap()
            .into_iter()
            .map(|d| (d - range().start).num_days())
            .collect();
        assert_eq!(offsets, vec![26, 13, 37, 163, 3]);
    }

    #[test]
    fn test_seed_changes_order() {
        let a = DateSample::new(range(), 0).take(20).unwrap();
        let b = DateSample::new(range(), 1).take(20).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_take_more_than_range_is_error() {
        let sample = DateSample::new(DateRange::parse("2000-01-01", "2000-01-03").unwrap(), 0);
        assert_eq!(sample.len(), 3);
        assert!(sample.take(4).is_err());
    }

    #[test]
    fn test_fraction_above() {
        let rasters = vec![
            Raster::new(vec![5.0, 1.0], 2, 1).unwrap(),
            Raster::new(vec![5.0, 4.4704], 2, 1).unwrap(),
            Raster::new(vec![1.0, 9.0], 2, 1).unwrap(),
            Raster::new(vec![6.0, 0.0], 2, 1).unwrap(),
        ];
        let fraction = fraction_above(&rasters, 4.4704).unwrap();
        assert_eq!(fraction.data, vec![0.75, 0.25]);
    }

    #[tokio::test]
    async fn test_sampled_values_follow_sample_order() {
        let sample = DateSample::new(range(), DEFAULT_SEED);
        let values = sampled_values(&sample, 5, |date| async move { Ok(date) }).await.unwrap();
        assert_eq!(values, sample.take(5).unwrap());
    }
}
