//! Remote raster service interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use climate_common::{BoundingBox, ClimateResult, DateSegment};

/// A server-side band expression.
///
/// The expression text is never interpreted locally; it is handed to the
/// remote service together with the input-band bindings it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandExpression {
    /// Expression source, e.g. `"sun = flux > 0.001 ? (1 - cloud) : 0"`.
    pub expression: String,
    /// Variable name -> source band name.
    pub bindings: BTreeMap<String, String>,
}

impl BandExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Bind an expression variable to a source band.
    pub fn bind(mut self, var: impl Into<String>, band: impl Into<String>) -> Self {
        self.bindings.insert(var.into(), band.into());
        self
    }
}

/// How the filtered image collection is collapsed into one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Sum,
    Max,
}

/// Day-of-year window applied to every year of the date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarFilter {
    pub start_day: u32,
    pub end_day: u32,
}

/// Description of one server-side image computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Source image collection id.
    pub collection: String,
    /// Half-open date window filtering the collection.
    pub window: DateSegment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_filter: Option<CalendarFilter>,
    /// Per-image expression applied before reduction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<BandExpression>,
    pub reducer: Reducer,
}

impl ImageSpec {
    pub fn new(collection: impl Into<String>, window: DateSegment, reducer: Reducer) -> Self {
        Self {
            collection: collection.into(),
            window,
            calendar_filter: None,
            expression: None,
            reducer,
        }
    }

    pub fn with_calendar_filter(mut self, filter: CalendarFilter) -> Self {
        self.calendar_filter = Some(filter);
        self
    }

    pub fn with_expression(mut self, expression: BandExpression) -> Self {
        self.expression = Some(expression);
        self
    }
}

/// Opaque reference to an image evaluated by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub String);

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote geospatial analytics service.
///
/// Each call is a blocking round-trip of seconds to minutes on the remote
/// side. Implementations must not retry; callers decide.
#[async_trait]
pub trait RemoteRasterService: Send + Sync {
    /// Compose an image server-side.
    async fn evaluate(&self, spec: &ImageSpec) -> ClimateResult<ImageHandle>;

    /// Sample `band` of `image` over `bbox` at `resolution` degrees/pixel.
    ///
    /// Rows run north to south, columns west to east. Returns `None` if the
    /// image has no such band.
    async fn sample(
        &self,
        image: &ImageHandle,
        bbox: &BoundingBox,
        band: &str,
        resolution: f64,
    ) -> ClimateResult<Option<Vec<Vec<f32>>>>;
}
