//! Common traits and types for generation engines

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, Result};

/// Height and width must be multiples of this for latent diffusion models
pub const RESOLUTION_STRIDE: u32 = 8;

/// Request to generate one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The prompt to generate the image from
    pub prompt: String,

    /// Guidance scale / CFG scale
    pub guidance_scale: f32,

    /// Number of denoising steps
    pub num_inference_steps: u32,

    /// Image height in pixels
    pub height: u32,

    /// Image width in pixels
    pub width: u32,
}

impl GenerationRequest {
    /// Check field values before the request is handed to an engine.
    ///
    /// Resolution stride is not checked here; that constraint belongs to the
    /// engine and is reported by it.
    pub fn validate(&self) -> Result<()> {
        if !self.guidance_scale.is_finite() || self.guidance_scale <= 0.0 {
            return Err(AppError::Validation(format!(
                "guidance_scale must be a positive number, got {}",
                self.guidance_scale
            )));
        }
        if self.num_inference_steps == 0 {
            return Err(AppError::Validation(
                "num_inference_steps must be greater than 0".to_string(),
            ));
        }
        if self.height == 0 || self.width == 0 {
            return Err(AppError::Validation(format!(
                "height and width must be positive, got {}x{}",
                self.height, self.width
            )));
        }
        Ok(())
    }
}

/// Raster produced by an engine (8-bit RGB)
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pixels: RgbImage,
}

impl GeneratedImage {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Build from a packed RGB buffer; `None` if the length does not match
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::from_rgb)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_rgb(self) -> RgbImage {
        self.pixels
    }
}

/// Opaque failure reported by an engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A text-to-image generation engine.
///
/// Engines are stateful and not reentrant: `render` takes `&mut self` and
/// blocks until the image is complete. Callers never hold an engine
/// directly; it lives on the executor thread (see [`crate::queue::executor`]).
pub trait GenerationEngine: Send + 'static {
    /// Get the engine name
    fn name(&self) -> &str;

    /// Render one image for the request
    fn render(&mut self, request: &GenerationRequest) -> std::result::Result<GeneratedImage, EngineError>;
}

/// Reject resolutions the diffusion model cannot produce
pub fn check_resolution(height: u32, width: u32) -> std::result::Result<(), EngineError> {
    if height % RESOLUTION_STRIDE != 0 || width % RESOLUTION_STRIDE != 0 {
        return Err(EngineError::new(format!(
            "`height` and `width` have to be divisible by {} but are {} and {}.",
            RESOLUTION_STRIDE, height, width
        )));
    }
    Ok(())
}
