//! In-memory stand-in for the remote raster service.
//!
//! Values are produced by a closure of `(spec, band, lon, lat)`, so a test can
//! make each date window, reducer or band return something recognisable.
//! Every call is counted, which lets tests prove that cached work is never
//! repeated.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use climate_common::{BoundingBox, ClimateError, ClimateResult};
use tiling::{ImageHandle, ImageSpec, RemoteRasterService};

type ValueFn = dyn Fn(&ImageSpec, &str, f64, f64) -> f32 + Send + Sync;

/// Snap a coordinate onto the sampling lattice.
pub fn snap(coord: f64, resolution: f64) -> f64 {
    (coord / resolution).round() * resolution
}

/// Scriptable fake [`RemoteRasterService`].
pub struct FakeRasterService {
    value: Arc<ValueFn>,
    images: Mutex<HashMap<String, ImageSpec>>,
    missing_bands: HashSet<String>,
    failing_bands: HashSet<String>,
    evaluate_calls: AtomicUsize,
    sample_calls: AtomicUsize,
}

impl FakeRasterService {
    /// A service whose every sample is `value`.
    pub fn constant(value: f32) -> Self {
        Self::with_values(move |_, _, _, _| value)
    }

    /// A service sampling `value(spec, band, lon, lat)`.
    pub fn with_values(value: impl Fn(&ImageSpec, &str, f64, f64) -> f32 + Send + Sync + 'static) -> Self {
        Self {
            value: Arc::new(value),
            images: Mutex::new(HashMap::new()),
            missing_bands: HashSet::new(),
            failing_bands: HashSet::new(),
            evaluate_calls: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
        }
    }

    /// Report `band` as absent from every image.
    pub fn without_band(mut self, band: impl Into<String>) -> Self {
        self.missing_bands.insert(band.into());
        self
    }

    /// Fail every sample of `band` with a transient error.
    pub fn failing_band(mut self, band: impl Into<String>) -> Self {
        self.failing_bands.insert(band.into());
        self
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    pub fn sample_calls(&self) -> usize {
        self.sample_calls.load(Ordering::SeqCst)
    }

    /// Evaluate and sample calls combined.
    pub fn total_calls(&self) -> usize {
        self.evaluate_calls() + self.sample_calls()
    }
}

#[async_trait]
impl RemoteRasterService for FakeRasterService {
    async fn evaluate(&self, spec: &ImageSpec) -> ClimateResult<ImageHandle> {
        let n = self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        let handle = format!("img-{}", n);
        self.images
            .lock()
            .map_err(|_| ClimateError::TransientRemote("fake service poisoned".into()))?
            .insert(handle.clone(), spec.clone());
        Ok(ImageHandle(handle))
    }

    async fn sample(
        &self,
        image: &ImageHandle,
        bbox: &BoundingBox,
        band: &str,
        resolution: f64,
    ) -> ClimateResult<Option<Vec<Vec<f32>>>> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_bands.contains(band) {
            return Err(ClimateError::TransientRemote(format!("quota exceeded sampling '{}'", band)));
        }
        if self.missing_bands.contains(band) {
            return Ok(None);
        }

        let spec = self
            .images
            .lock()
            .map_err(|_| ClimateError::TransientRemote("fake service poisoned".into()))?
            .get(&image.0)
            .cloned()
            .ok_or_else(|| ClimateError::TransientRemote(format!("unknown image {}", image)))?;

        let rows = ((bbox.max_lat - bbox.min_lat) / resolution).round() as usize + 1;
        let cols = ((bbox.max_lon - bbox.min_lon) / resolution).round() as usize + 1;

        let grid = (0..rows)
            .map(|r| {
                let lat = snap(bbox.max_lat - r as f64 * resolution, resolution);
                (0..cols)
                    .map(|c| {
                        let lon = snap(bbox.min_lon + c as f64 * resolution, resolution);
                        (self.value)(&spec, band, lon, lat)
                    })
                    .collect()
            })
            .collect();

        Ok(Some(grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::time::parse_date;
    use climate_common::DateSegment;
    use tiling::Reducer;

    fn spec() -> ImageSpec {
        let window = DateSegment::new(parse_date("2000-01-01").unwrap(), parse_date("2000-01-02").unwrap()).unwrap();
        ImageSpec::new("TEST/COLLECTION", window, Reducer::Mean)
    }

    #[tokio::test]
    async fn test_sample_shape_matches_shrunk_tile() {
        let service = FakeRasterService::constant(2.0);
        let image = service.evaluate(&spec()).await.unwrap();
        let bbox = BoundingBox::new(-180.0, -90.0, -135.25, -45.25);
        let grid = service.sample(&image, &bbox, "b", 0.25).await.unwrap().unwrap();
        assert_eq!(grid.len(), 180);
        assert_eq!(grid[0].len(), 180);
        assert_eq!(service.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_and_failing_bands() {
        let service = FakeRasterService::constant(1.0).without_band("gone").failing_band("flaky");
        let image = service.evaluate(&spec()).await.unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(service.sample(&image, &bbox, "gone", 0.5).await.unwrap().is_none());
        assert!(service.sample(&image, &bbox, "flaky", 0.5).await.is_err());
    }
}
