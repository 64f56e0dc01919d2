//! Dense 2D rasters fetched from the remote service.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};
use crate::BoundingBox;

/// A row-major grid of values.
///
/// Row 0 is the northernmost row, column 0 the westernmost column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    /// Values in row-major order, top-to-bottom.
    pub data: Vec<f32>,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Raster {
    /// Create a raster from row-major data, checking the length.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> ClimateResult<Self> {
        if data.len() != width * height {
            return Err(ClimateError::InvalidRaster(format!(
                "{} values cannot fill a {}x{} raster",
                data.len(),
                height,
                width
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Raster of `height` rows and `width` columns all set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Build a raster from nested rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> ClimateResult<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ClimateError::InvalidRaster("empty grid".to_string()));
        }

        let mut data = Vec::with_capacity(width * height);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ClimateError::InvalidRaster(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            data.extend(row);
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// Copy out the sub-grid starting at (`col`, `row`).
    pub fn window(&self, col: usize, row: usize, width: usize, height: usize) -> ClimateResult<Raster> {
        if col + width > self.width || row + height > self.height {
            return Err(ClimateError::FatalInvariant(format!(
                "window {}x{} at ({}, {}) exceeds {}x{} raster",
                height, width, row, col, self.height, self.width
            )));
        }
        let mut data = Vec::with_capacity(width * height);
        for r in row..row + height {
            data.extend_from_slice(&self.row(r)[col..col + width]);
        }
        Ok(Raster {
            data,
            width,
            height,
        })
    }

    /// Arithmetic mean of all values.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|v| *v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if raster is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A raster together with the bounding box it was sampled over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterTile {
    pub bbox: BoundingBox,
    pub raster: Raster,
}

impl RasterTile {
    pub fn new(bbox: BoundingBox, raster: Raster) -> Self {
        Self { bbox, raster }
    }
}
