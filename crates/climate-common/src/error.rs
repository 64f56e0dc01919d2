//! Error types for climate-agg crates.

use thiserror::Error;

use crate::BoundingBox;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// Primary error type for the tiling, caching and aggregation pipeline.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Configuration Errors ===
    /// Bad tile geometry or date boundaries. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    // === Data Errors ===
    /// The remote service has no data for the requested band/window.
    #[error("no data for band '{band}' in {bbox}")]
    DataUnavailable { bbox: BoundingBox, band: String },

    /// The remote service returned a malformed grid.
    #[error("invalid raster from remote service: {0}")]
    InvalidRaster(String),

    // === Remote Errors ===
    /// Network, quota or timeout failures. Re-running is safe.
    #[error("remote service error: {0}")]
    TransientRemote(String),

    // === Invariant Errors ===
    /// Ragged tiles or mismatched tile counts during merge.
    #[error("fatal invariant violation: {0}")]
    FatalInvariant(String),

    // === Storage Errors ===
    #[error("cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ClimateError {
    /// Whether re-running the same computation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClimateError::TransientRemote(_) | ClimateError::Cache(_))
    }

    /// Short label for logs and warm-run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ClimateError::Config(_) => "config",
            ClimateError::DataUnavailable { .. } => "data_unavailable",
            ClimateError::InvalidRaster(_) => "invalid_raster",
            ClimateError::TransientRemote(_) => "transient_remote",
            ClimateError::FatalInvariant(_) => "fatal_invariant",
            ClimateError::Cache(_) => "cache",
            ClimateError::Serialization(_) => "serialization",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for ClimateError {
    fn from(err: std::io::Error) -> Self {
        ClimateError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ClimateError {
    fn from(err: serde_json::Error) -> Self {
        ClimateError::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_names_bbox_and_band() {
        let err = ClimateError::DataUnavailable {
            bbox: BoundingBox::new(-180.0, -90.0, -120.25, -30.25),
            band: "sun".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sun"));
        assert!(msg.contains("-120.25"));
        assert_eq!(err.kind(), "data_unavailable");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(ClimateError::TransientRemote("quota".into()).is_transient());
        assert!(!ClimateError::FatalInvariant("ragged".into()).is_transient());
    }
}
