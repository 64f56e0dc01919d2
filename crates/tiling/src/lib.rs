//! Tiled download of global rasters from a remote analytics service.
//!
//! The remote service only returns bounded-size grids, so a global image is
//! fetched tile by tile and stitched back together:
//!
//! ```text
//! download_image(spec, band)
//!      │
//!      ├─► RemoteRasterService::evaluate(spec) ─► ImageHandle
//!      │
//!      ├─► generate_tiles(degree_size, resolution)
//!      │         (south→north bands, west→east within a band)
//!      │
//!      ├─► fetch_tile(bbox) for every tile, sequentially
//!      │
//!      └─► merge(tiles, tiles_per_band)
//!               (bands reversed so row 0 is the north edge)
//!               │
//!               ▼
//!          global Raster
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tiling::{download_image, ImageSpec, Reducer, TilingConfig};
//!
//! let spec = ImageSpec::new("ECMWF/ERA5/DAILY", range.as_segment(), Reducer::Mean);
//! let raster = download_image(&service, &spec, "maximum_2m_air_temperature", &TilingConfig::new(60, 0.25)).await?;
//! ```

pub mod config;
pub mod download;
pub mod fetcher;
pub mod http;
pub mod merger;
pub mod planner;
pub mod remote;

// Re-export commonly used types at crate root
pub use config::TilingConfig;
pub use download::download_image;
pub use fetcher::fetch_tile;
pub use http::{HttpRasterService, HttpServiceConfig};
pub use merger::{merge, merge_tiles, split};
pub use planner::{generate_tiles, nominal_boxes, TileGrid};
pub use remote::{BandExpression, CalendarFilter, ImageHandle, ImageSpec, Reducer, RemoteRasterService};
