//! PNG encoding for generated images

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::engine::GeneratedImage;
use crate::error::{AppError, Result};

pub const CONTENT_TYPE: &str = "image/png";

/// Encode an image as PNG
pub fn encode(image: &GeneratedImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    PngEncoder::new(&mut buffer)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(|e| AppError::Encoding(e.to_string()))?;

    Ok(buffer)
}

/// Encode on the blocking pool so request threads stay free
pub async fn encode_blocking(image: GeneratedImage) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode(&image))
        .await
        .map_err(|e| AppError::Encoding(format!("encoder task failed: {}", e)))?
}
