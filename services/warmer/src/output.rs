//! Writing finished statistics to disk.
//!
//! Each statistic becomes two files: `{name}.bin` holding the raster as
//! little-endian `f32` in row-major order (north row first), and
//! `{name}.json` describing its shape and unit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use statistics::StatOutput;

/// Sidecar describing a `.bin` raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatMetadata {
    pub name: String,
    pub unit: String,
    pub rows: usize,
    pub cols: usize,
    pub dtype: String,
    pub byte_order: String,
}

impl StatMetadata {
    pub fn for_output(stat: &StatOutput) -> Self {
        Self {
            name: stat.name.clone(),
            unit: stat.unit.as_str().to_string(),
            rows: stat.raster.height,
            cols: stat.raster.width,
            dtype: "float32".to_string(),
            byte_order: "little".to_string(),
        }
    }
}

fn encode(stat: &StatOutput) -> Vec<u8> {
    stat.raster.data.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Write one statistic into `dir`, returning the path of the `.bin` file.
pub async fn write_stat(dir: &Path, stat: &StatOutput) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let bin_path = dir.join(format!("{}.bin", stat.name));
    let json_path = dir.join(format!("{}.json", stat.name));

    tokio::fs::write(&bin_path, encode(stat))
        .await
        .with_context(|| format!("failed to write {}", bin_path.display()))?;

    let metadata = serde_json::to_vec_pretty(&StatMetadata::for_output(stat))?;
    tokio::fs::write(&json_path, metadata)
        .await
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    debug!(path = %bin_path.display(), "Wrote statistic");
    Ok(bin_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::Raster;
    use statistics::Unit;

    #[tokio::test]
    async fn test_write_stat() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::new(vec![1.0, 2.5, -3.0, 0.25, 4.0, 5.0], 3, 2).unwrap();
        let stat = StatOutput::new("sunniness", Unit::Percent, raster.clone());

        let path = write_stat(dir.path(), &stat).await.unwrap();
        assert_eq!(path, dir.path().join("sunniness.bin"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 6 * 4);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, raster.data);

        let sidecar: StatMetadata =
            serde_json::from_slice(&std::fs::read(dir.path().join("sunniness.json")).unwrap()).unwrap();
        assert_eq!(sidecar.rows, 2);
        assert_eq!(sidecar.cols, 3);
        assert_eq!(sidecar.unit, "%");
        assert_eq!(sidecar.dtype, "float32");
    }
}
