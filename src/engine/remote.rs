//! Engine that delegates rendering to an external inference server

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::traits::{EngineError, GeneratedImage, GenerationEngine, GenerationRequest};

/// Blocking HTTP client for a diffusion server.
///
/// Uses the blocking reqwest client: it must be built, used and dropped on
/// the executor thread, never inside the async runtime.
pub struct RemoteEngine {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ApiGenerateRequest<'a> {
    prompt: &'a str,
    guidance_scale: f32,
    num_inference_steps: u32,
    height: u32,
    width: u32,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    #[serde(default)]
    images: Vec<ApiImageData>,
    #[serde(default)]
    data: Vec<ApiImageData>,
}

#[derive(Debug, Deserialize)]
struct ApiImageData {
    #[serde(default, alias = "base64")]
    b64_json: Option<String>,
}

impl RemoteEngine {
    /// Create a new remote engine from configuration
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| EngineError::new("remote engine requires `engine.endpoint`"))?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EngineError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
        })
    }

    fn decode_payload(&self, content_type: &str, body: &[u8]) -> Result<Vec<u8>, EngineError> {
        if content_type.starts_with("image/") {
            return Ok(body.to_vec());
        }

        let response: ApiGenerateResponse = serde_json::from_slice(body)
            .map_err(|e| EngineError::new(format!("Failed to parse response: {}", e)))?;

        let encoded = response
            .images
            .into_iter()
            .chain(response.data)
            .find_map(|img| img.b64_json)
            .ok_or_else(|| EngineError::new("Inference server returned no image"))?;

        decode_base64(&encoded)
    }
}

impl GenerationEngine for RemoteEngine {
    fn name(&self) -> &str {
        "remote"
    }

    fn render(&mut self, request: &GenerationRequest) -> Result<GeneratedImage, EngineError> {
        let url = format!("{}/generate/", self.endpoint);
        debug!(url = %url, model = %self.model, "Sending generate request");

        let api_request = ApiGenerateRequest {
            prompt: &request.prompt,
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
            height: request.height,
            width: request.width,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .json(&api_request)
            .send()
            .map_err(|e| {
                warn!(url = %url, error = %e, "Inference server request failed");
                EngineError::new(format!("Connection failed to {}: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::new(format!(
                "Inference server returned {}: {}",
                status, body
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .map_err(|e| EngineError::new(format!("Failed to read response body: {}", e)))?;

        let encoded = self.decode_payload(&content_type, &body)?;
        let image = image::load_from_memory(&encoded)
            .map_err(|e| EngineError::new(format!("Inference server returned an unreadable image: {}", e)))?
            .to_rgb8();

        if image.width() != request.width || image.height() != request.height {
            return Err(EngineError::new(format!(
                "Inference server returned {}x{} image, expected {}x{}",
                image.width(),
                image.height(),
                request.width,
                request.height
            )));
        }

        Ok(GeneratedImage::from_rgb(image))
    }
}

/// Decode base64 image data, tolerating a `data:image/...;base64,` prefix
fn decode_base64(encoded: &str) -> Result<Vec<u8>, EngineError> {
    let data = encoded.rsplit(',').next().unwrap_or(encoded);

    STANDARD
        .decode(data.trim())
        .map_err(|e| EngineError::new(format!("Invalid base64 data: {}", e)))
}
