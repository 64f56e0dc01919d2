//! Configuration for global tiled downloads.

use serde::{Deserialize, Serialize};

use climate_common::{ClimateError, ClimateResult};

/// Tile geometry used when downloading one global image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilingConfig {
    /// Edge length of one tile in degrees. Must divide 180 and 360.
    pub degree_size: u32,

    /// Sample spacing in degrees per pixel.
    pub resolution: f64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            degree_size: 45,
            resolution: 0.25,
        }
    }
}

impl TilingConfig {
    pub fn new(degree_size: u32, resolution: f64) -> Self {
        Self {
            degree_size,
            resolution,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TILE_DEGREE_SIZE") {
            if let Ok(size) = val.parse() {
                config.degree_size = size;
            }
        }

        if let Ok(val) = std::env::var("TILE_RESOLUTION") {
            if let Ok(res) = val.parse() {
                config.resolution = res;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ClimateResult<()> {
        if self.degree_size == 0 || 180 % self.degree_size != 0 || 360 % self.degree_size != 0 {
            return Err(ClimateError::Config(format!(
                "degree_size {} must evenly divide both 180 and 360",
                self.degree_size
            )));
        }

        if !(self.resolution > 0.0 && self.resolution < self.degree_size as f64) {
            return Err(ClimateError::Config(format!(
                "resolution {} must be positive and smaller than degree_size {}",
                self.resolution, self.degree_size
            )));
        }

        Ok(())
    }

    /// Number of latitude bands (tile rows) covering the globe.
    pub fn lat_bands(&self) -> usize {
        (180 / self.degree_size) as usize
    }

    /// Number of tiles in one latitude band.
    pub fn tiles_per_band(&self) -> usize {
        (360 / self.degree_size) as usize
    }

    /// Total tile count.
    pub fn tile_count(&self) -> usize {
        self.lat_bands() * self.tiles_per_band()
    }

    /// Samples along one tile edge.
    pub fn tile_pixels(&self) -> usize {
        (self.degree_size as f64 / self.resolution).round() as usize
    }
}
