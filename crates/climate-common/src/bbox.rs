//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClimateError, ClimateResult};

/// A geographic bounding box in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Create a bounding box, rejecting inverted or out-of-globe corners.
    pub fn validated(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> ClimateResult<Self> {
        let bbox = Self::new(min_lon, min_lat, max_lon, max_lat);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check `min < max` on both axes and that all corners lie on the globe.
    pub fn validate(&self) -> ClimateResult<()> {
        if !(self.min_lon < self.max_lon && self.min_lat < self.max_lat) {
            return Err(ClimateError::Config(format!(
                "bounding box {} has min >= max",
                self
            )));
        }
        let lon_ok = (-180.0..=180.0).contains(&self.min_lon) && (-180.0..=180.0).contains(&self.max_lon);
        let lat_ok = (-90.0..=90.0).contains(&self.min_lat) && (-90.0..=90.0).contains(&self.max_lat);
        if !(lon_ok && lat_ok) {
            return Err(ClimateError::Config(format!(
                "bounding box {} lies outside [-180,180]x[-90,90]",
                self
            )));
        }
        Ok(())
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check if this bbox overlaps another with non-zero area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
