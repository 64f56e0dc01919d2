//! Stitching tile rasters into one global raster.

use tracing::debug;

use climate_common::{ClimateError, ClimateResult, Raster, RasterTile};

/// Merge tiles emitted in planner order into a single raster.
///
/// Tiles are grouped into latitude bands of `tiles_per_band` consecutive
/// tiles. Within a band they are joined west to east; bands are stacked in
/// reverse emission order so the northernmost band comes first.
///
/// All tiles of a band must share a row count, and all tiles in the same
/// longitude column must share a column count. Anything else is a
/// [`ClimateError::FatalInvariant`].
pub fn merge(tiles: &[Raster], tiles_per_band: usize) -> ClimateResult<Raster> {
    if tiles.is_empty() || tiles_per_band == 0 || tiles.len() % tiles_per_band != 0 {
        return Err(ClimateError::FatalInvariant(format!(
            "{} tiles cannot form bands of {}",
            tiles.len(),
            tiles_per_band
        )));
    }

    let bands: Vec<&[Raster]> = tiles.chunks(tiles_per_band).collect();

    // Validate shapes before copying anything
    let column_widths: Vec<usize> = bands[0].iter().map(|t| t.width).collect();
    let mut band_rows = Vec::with_capacity(bands.len());
    for (band_idx, band) in bands.iter().enumerate() {
        let rows = band[0].height;
        if let Some((i, t)) = band.iter().enumerate().find(|(_, t)| t.height != rows || t.is_empty()) {
            return Err(ClimateError::FatalInvariant(format!(
                "band {} tile {} has {} rows, expected {}",
                band_idx, i, t.height, rows
            )));
        }
        // tiles stacked in one longitude column must line up
        for (i, (tile, expected)) in band.iter().zip(&column_widths).enumerate() {
            if tile.width != *expected {
                return Err(ClimateError::FatalInvariant(format!(
                    "band {} tile {} is {} columns wide, expected {}",
                    band_idx, i, tile.width, expected
                )));
            }
        }
        band_rows.push(rows);
    }

    let width: usize = column_widths.iter().sum();
    let height: usize = band_rows.iter().sum();
    let mut data = Vec::with_capacity(width * height);

    for band in bands.iter().rev() {
        for r in 0..band[0].height {
            for tile in band.iter() {
                data.extend_from_slice(tile.row(r));
            }
        }
    }

    debug!(rows = height, cols = width, bands = bands.len(), "Merged tiles");

    Raster::new(data, width, height)
}

/// Merge fetched tiles, dropping their provenance.
pub fn merge_tiles(tiles: &[RasterTile], tiles_per_band: usize) -> ClimateResult<Raster> {
    let rasters: Vec<Raster> = tiles.iter().map(|t| t.raster.clone()).collect();
    merge(&rasters, tiles_per_band)
}

/// Cut a global raster into tiles in planner emission order.
///
/// Inverse of [`merge`]: `merge(&split(r, b, t)?, t)? == r`.
pub fn split(raster: &Raster, lat_bands: usize, tiles_per_band: usize) -> ClimateResult<Vec<Raster>> {
    if lat_bands == 0
        || tiles_per_band == 0
        || raster.height % lat_bands != 0
        || raster.width % tiles_per_band != 0
    {
        return Err(ClimateError::FatalInvariant(format!(
            "{}x{} raster cannot be cut into {}x{} tiles",
            raster.height, raster.width, lat_bands, tiles_per_band
        )));
    }

    let tile_rows = raster.height / lat_bands;
    let tile_cols = raster.width / tiles_per_band;
    let mut tiles = Vec::with_capacity(lat_bands * tiles_per_band);

    for lat_idx in 0..lat_bands {
        // southernmost band is the last row block
        let block = lat_bands - 1 - lat_idx;
        for lon_idx in 0..tiles_per_band {
            tiles.push(raster.window(lon_idx * tile_cols, block * tile_rows, tile_cols, tile_rows)?);
        }
    }

    Ok(tiles)
}
