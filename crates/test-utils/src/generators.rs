//! Test data generators for creating synthetic climate-like data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use climate_common::Raster;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being split/merged correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// [`create_test_grid`] wrapped as a [`Raster`].
pub fn create_test_raster(width: usize, height: usize) -> Raster {
    Raster {
        data: create_test_grid(width, height),
        width,
        height,
    }
}

/// The global raster a correct tiled download should produce.
///
/// Row `i` samples latitude `90 - resolution * (i + 1)` and column `j`
/// samples longitude `-180 + resolution * j`, matching the shrunk tile
/// edges of the planner.
pub fn global_reference(resolution: f64, value: impl Fn(f64, f64) -> f32) -> Raster {
    let width = (360.0 / resolution).round() as usize;
    let height = (180.0 / resolution).round() as usize;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat = 90.0 - resolution * (row + 1) as f64;
        for col in 0..width {
            let lon = -180.0 + resolution * col as f64;
            data.push(value(lon, lat));
        }
    }
    Raster {
        data,
        width,
        height,
    }
}
