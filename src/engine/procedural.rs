//! Built-in deterministic renderer
//!
//! Paints a banded gradient whose palette is derived from the prompt. It lets
//! the gateway run end to end on machines without model weights, and it
//! enforces the same resolution constraint as a diffusion pipeline.

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::engine::traits::{
    check_resolution, EngineError, GeneratedImage, GenerationEngine, GenerationRequest,
};

/// Largest image the renderer will allocate (4096 x 4096)
pub const MAX_PIXELS: u64 = 4096 * 4096;

pub struct ProceduralEngine {
    model: String,
    rendered: u64,
}

impl ProceduralEngine {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            rendered: 0,
        }
    }

    /// Number of images rendered by this instance
    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl GenerationEngine for ProceduralEngine {
    fn name(&self) -> &str {
        "procedural"
    }

    fn render(&mut self, request: &GenerationRequest) -> Result<GeneratedImage, EngineError> {
        check_resolution(request.height, request.width)?;

        let pixels = u64::from(request.width) * u64::from(request.height);
        if pixels > MAX_PIXELS {
            return Err(EngineError::new(format!(
                "requested {}x{} image exceeds the {} pixel limit",
                request.width, request.height, MAX_PIXELS
            )));
        }

        let seed = fnv1a(request.prompt.as_bytes()) ^ fnv1a(self.model.as_bytes());
        let base = [
            (seed & 0xff) as f32,
            ((seed >> 8) & 0xff) as f32,
            ((seed >> 16) & 0xff) as f32,
        ];
        let angle = ((seed >> 24) & 0xff) as f32 / 255.0 * std::f32::consts::PI;
        let (dir_x, dir_y) = (angle.cos(), angle.sin());
        let bands = request.num_inference_steps.clamp(1, 64) as f32;
        let contrast = (request.guidance_scale / 7.5).clamp(0.25, 2.0);

        let (width, height) = (request.width as f32, request.height as f32);
        let image = RgbImage::from_fn(request.width, request.height, |x, y| {
            let u = x as f32 / width;
            let v = y as f32 / height;
            let t = ((u * dir_x + v * dir_y) * bands).fract().abs();
            let shade = 1.0 + (t - 0.5) * contrast;
            Rgb(base.map(|c| (c * shade).clamp(0.0, 255.0) as u8))
        });

        self.rendered += 1;
        debug!(
            prompt = %request.prompt,
            width = request.width,
            height = request.height,
            rendered = self.rendered,
            "Procedural render complete"
        );

        Ok(GeneratedImage::from_rgb(image))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}
