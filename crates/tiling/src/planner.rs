//! Global tile planning.
//!
//! Tiles are emitted latitude band by latitude band, south to north, and
//! west to east within a band. [`crate::merger::merge`] relies on exactly
//! this order.

use climate_common::{BoundingBox, ClimateResult};

use crate::config::TilingConfig;

/// Generate the ordered tile boxes covering the globe.
///
/// Each box is shrunk by one `resolution` step on its north and east edges so
/// that a tile's last sample does not repeat the neighbouring tile's first
/// sample when both are resampled independently.
pub fn generate_tiles(degree_size: u32, resolution: f64) -> ClimateResult<Vec<BoundingBox>> {
    let config = TilingConfig::new(degree_size, resolution);
    config.validate()?;

    nominal_boxes(&config)
        .into_iter()
        .map(|b| BoundingBox::validated(b.min_lon, b.min_lat, b.max_lon - resolution, b.max_lat - resolution))
        .collect()
}

/// The unshrunk tile boxes, in emission order.
pub fn nominal_boxes(config: &TilingConfig) -> Vec<BoundingBox> {
    let d = config.degree_size as f64;
    let mut tiles = Vec::with_capacity(config.tile_count());

    for lat_idx in 0..config.lat_bands() {
        for lon_idx in 0..config.tiles_per_band() {
            let min_lat = -90.0 + lat_idx as f64 * d;
            let min_lon = -180.0 + lon_idx as f64 * d;
            tiles.push(BoundingBox::new(min_lon, min_lat, min_lon + d, min_lat + d));
        }
    }

    tiles
}

/// A planned tile grid together with its geometry.
#[derive(Debug, Clone)]
pub struct TileGrid {
    config: TilingConfig,
    tiles: Vec<BoundingBox>,
}

impl TileGrid {
    /// Plan the grid for `config`.
    pub fn plan(config: TilingConfig) -> ClimateResult<Self> {
        let tiles = generate_tiles(config.degree_size, config.resolution)?;
        Ok(Self { config, tiles })
    }

    pub fn tiles(&self) -> &[BoundingBox] {
        &self.tiles
    }

    pub fn config(&self) -> &TilingConfig {
        &self.config
    }

    pub fn lat_bands(&self) -> usize {
        self.config.lat_bands()
    }

    /// Same as [`Self::tiles_per_band`]: one tile per longitude band.
    pub fn lon_bands(&self) -> usize {
        self.config.tiles_per_band()
    }

    pub fn tiles_per_band(&self) -> usize {
        self.config.tiles_per_band()
    }

    pub fn tile_pixels(&self) -> usize {
        self.config.tile_pixels()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_tile() {
        let tiles = generate_tiles(45, 0.25).unwrap();
        assert_eq!(tiles.len(), 4 * 8);
        assert_eq!(tiles[0], BoundingBox::new(-180.0, -90.0, -135.25, -45.25));
        assert_eq!(tiles[31], BoundingBox::new(135.0, 45.0, 179.75, 89.75));
    }

    #[test]
    fn test_order_is_south_to_north_then_west_to_east() {
        let tiles = generate_tiles(90, 0.5).unwrap();
        // second tile is east of the first, same band
        assert_eq!(tiles[1].min_lat, tiles[0].min_lat);
        assert!(tiles[1].min_lon > tiles[0].min_lon);
        // first tile of the next band is north
        assert_eq!(tiles[4].min_lon, -180.0);
        assert!(tiles[4].min_lat > tiles[0].min_lat);
    }

    #[test]
    fn test_planned_boxes_are_valid() {
        for (d, res) in [(1, 0.25), (45, 0.25), (180, 5.0)] {
            let tiles = generate_tiles(d, res).unwrap();
            assert!(tiles.iter().all(|b| b.validate().is_ok()));
        }
    }

    #[test]
    fn test_tile_grid_geometry() {
        let grid = TileGrid::plan(TilingConfig::new(60, 0.25)).unwrap();
        assert_eq!(grid.lat_bands(), 3);
        assert_eq!(grid.lon_bands(), 6);
        assert_eq!(grid.len(), 18);
        assert_eq!(grid.tile_pixels(), 240);
    }

    #[test]
    fn test_invalid_degree_size_is_config_error() {
        let result = generate_tiles(7, 0.25);
        assert!(matches!(result, Err(climate_common::ClimateError::Config(_))));
    }
}
