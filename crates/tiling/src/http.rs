//! JSON-over-HTTP client for a remote raster service.
//!
//! Endpoints:
//! - `POST {base}/v1/evaluate` with an [`ImageSpec`] body, answering `{"handle": "..."}`
//! - `POST {base}/v1/sample` answering `{"values": [[...], ...]}`, or `404`
//!   when the band does not exist

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use climate_common::{BoundingBox, ClimateError, ClimateResult};

use crate::remote::{ImageHandle, ImageSpec, RemoteRasterService};

/// Connection settings for [`HttpRasterService`].
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    /// Service root, e.g. `http://raster-gateway:8080`.
    pub base_url: String,
    /// Per-request timeout. Image evaluation can take minutes.
    pub request_timeout: Duration,
}

impl Default for HttpServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    handle: String,
}

#[derive(Debug, Serialize)]
struct SampleRequest<'a> {
    handle: &'a str,
    bbox: &'a BoundingBox,
    band: &'a str,
    resolution: f64,
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    values: Vec<Vec<f32>>,
}

/// Remote raster service reached over HTTP.
pub struct HttpRasterService {
    client: Client,
    base_url: String,
}

impl HttpRasterService {
    pub fn new(config: &HttpServiceConfig) -> ClimateResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClimateError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

fn remote_error(context: &str, err: reqwest::Error) -> ClimateError {
    ClimateError::TransientRemote(format!("{}: {}", context, err))
}

#[async_trait]
impl RemoteRasterService for HttpRasterService {
    #[instrument(skip(self, spec), fields(collection = %spec.collection))]
    async fn evaluate(&self, spec: &ImageSpec) -> ClimateResult<ImageHandle> {
        let response = self
            .client
            .post(self.endpoint("evaluate"))
            .json(spec)
            .send()
            .await
            .map_err(|e| remote_error("evaluate request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClimateError::TransientRemote(format!(
                "evaluate returned {}",
                status
            )));
        }

        let body: EvaluateResponse = response
            .json()
            .await
            .map_err(|e| remote_error("invalid evaluate response", e))?;

        debug!(handle = %body.handle, "Image evaluated");
        Ok(ImageHandle(body.handle))
    }

    #[instrument(skip(self), fields(image = %image, bbox = %bbox))]
    async fn sample(
        &self,
        image: &ImageHandle,
        bbox: &BoundingBox,
        band: &str,
        resolution: f64,
    ) -> ClimateResult<Option<Vec<Vec<f32>>>> {
        let request = SampleRequest {
            handle: &image.0,
            bbox,
            band,
            resolution,
        };

        let response = self
            .client
            .post(self.endpoint("sample"))
            .json(&request)
            .send()
            .await
            .map_err(|e| remote_error("sample request failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: SampleResponse = response
                    .json()
                    .await
                    .map_err(|e| remote_error("invalid sample response", e))?;
                Ok(Some(body.values))
            }
            status => Err(ClimateError::TransientRemote(format!(
                "sample returned {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let service = HttpRasterService::new(&HttpServiceConfig {
            base_url: "http://gateway:8080/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(service.endpoint("sample"), "http://gateway:8080/v1/sample");
    }

    #[test]
    fn test_sample_request_shape() {
        let bbox = BoundingBox::new(-180.0, -90.0, -120.25, -30.25);
        let request = SampleRequest {
            handle: "img-1",
            bbox: &bbox,
            band: "sun",
            resolution: 0.25,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["handle"], "img-1");
        assert_eq!(json["bbox"]["max_lon"], -120.25);
        assert_eq!(json["resolution"], 0.25);
    }
}
