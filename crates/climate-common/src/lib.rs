//! Common types and utilities shared across all climate-agg crates.

pub mod bbox;
pub mod error;
pub mod raster;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{ClimateError, ClimateResult};
pub use raster::{Raster, RasterTile};
pub use time::{DateRange, DateSegment};
