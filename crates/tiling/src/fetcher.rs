//! Single-tile retrieval from the remote service.

use tracing::{debug, instrument};

use climate_common::{BoundingBox, ClimateError, ClimateResult, Raster, RasterTile};

use crate::remote::{ImageHandle, RemoteRasterService};

/// Fetch one tile of `band` from an evaluated image.
///
/// The grid must be non-empty and rectangular. A missing band is reported as
/// [`ClimateError::DataUnavailable`] naming the tile and band. Remote errors
/// propagate untouched; there is no retry at this layer.
#[instrument(skip(source, image), fields(image = %image, bbox = %bbox))]
pub async fn fetch_tile(
    source: &dyn RemoteRasterService,
    image: &ImageHandle,
    bbox: &BoundingBox,
    band: &str,
    resolution: f64,
) -> ClimateResult<RasterTile> {
    let rows = source
        .sample(image, bbox, band, resolution)
        .await?
        .ok_or_else(|| ClimateError::DataUnavailable {
            bbox: *bbox,
            band: band.to_string(),
        })?;

    let raster = Raster::from_rows(rows).map_err(|e| match e {
        ClimateError::InvalidRaster(msg) => {
            ClimateError::InvalidRaster(format!("tile {} band '{}': {}", bbox, band, msg))
        }
        other => other,
    })?;

    debug!(rows = raster.height, cols = raster.width, "Fetched tile");

    Ok(RasterTile::new(*bbox, raster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::remote::ImageSpec;

    struct FixedService {
        rows: Option<Vec<Vec<f32>>>,
    }

    #[async_trait]
    impl RemoteRasterService for FixedService {
        async fn evaluate(&self, _spec: &ImageSpec) -> ClimateResult<ImageHandle> {
            Ok(ImageHandle("fixed".into()))
        }

        async fn sample(
            &self,
            _image: &ImageHandle,
            _bbox: &BoundingBox,
            _band: &str,
            _resolution: f64,
        ) -> ClimateResult<Option<Vec<Vec<f32>>>> {
            Ok(self.rows.clone())
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(-180.0, -90.0, -135.25, -45.25)
    }

    #[tokio::test]
    async fn test_fetch_tile_ok() {
        let source = FixedService {
            rows: Some(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
        };
        let tile = fetch_tile(&source, &ImageHandle("x".into()), &bbox(), "sun", 0.25)
            .await
            .unwrap();
        assert_eq!(tile.raster.shape(), (2, 2));
        assert_eq!(tile.bbox, bbox());
    }

    #[tokio::test]
    async fn test_missing_band_is_data_unavailable() {
        let source = FixedService { rows: None };
        let err = fetch_tile(&source, &ImageHandle("x".into()), &bbox(), "snow", 0.25)
            .await
            .unwrap_err();
        match err {
            ClimateError::DataUnavailable { bbox: b, band } => {
                assert_eq!(b, bbox());
                assert_eq!(band, "snow");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ragged_grid_rejected() {
        let source = FixedService {
            rows: Some(vec![vec![1.0, 2.0], vec![3.0]]),
        };
        let err = fetch_tile(&source, &ImageHandle("x".into()), &bbox(), "sun", 0.25)
            .await
            .unwrap_err();
        assert!(matches!(err, ClimateError::InvalidRaster(_)));
    }

    #[tokio::test]
    async fn test_empty_grid_rejected() {
        let source = FixedService { rows: Some(vec![]) };
        let result = fetch_tile(&source, &ImageHandle("x".into()), &bbox(), "sun", 0.25).await;
        assert!(result.is_err());
    }
}
