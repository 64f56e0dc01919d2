//! Full global download: plan, fetch every tile, merge.

use std::time::Instant;

use tracing::{debug, info, instrument};

use climate_common::{ClimateResult, Raster};

use crate::config::TilingConfig;
use crate::fetcher::fetch_tile;
use crate::merger::merge_tiles;
use crate::planner::TileGrid;
use crate::remote::{ImageSpec, RemoteRasterService};

/// Evaluate `spec` remotely and download `band` of it as one global raster.
///
/// Tiles are fetched one after another.
#[instrument(skip(source, spec), fields(collection = %spec.collection, band = %band, degree_size = config.degree_size))]
pub async fn download_image(
    source: &dyn RemoteRasterService,
    spec: &ImageSpec,
    band: &str,
    config: &TilingConfig,
) -> ClimateResult<Raster> {
    let grid = TileGrid::plan(*config)?;
    let start = Instant::now();

    let image = source.evaluate(spec).await?;
    debug!(image = %image, tiles = grid.len(), "Evaluated image");

    let mut tiles = Vec::with_capacity(grid.len());
    for (i, bbox) in grid.tiles().iter().enumerate() {
        let tile = fetch_tile(source, &image, bbox, band, config.resolution).await?;
        debug!(progress = format!("{}/{}", i + 1, grid.len()), "Tile downloaded");
        tiles.push(tile);
    }

    let merged = merge_tiles(&tiles, grid.tiles_per_band())?;

    info!(
        rows = merged.height,
        cols = merged.width,
        duration_ms = start.elapsed().as_millis() as u64,
        "Downloaded global image"
    );

    Ok(merged)
}
