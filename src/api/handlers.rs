//! Request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::GenerationRequest;
use crate::error::{AppError, Result};
use crate::queue::ExecutorStats;
use crate::response::{png, ImageResponse};
use crate::AppState;

/// `POST /generate/` - render one image and return it as PNG
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        prompt = %request.prompt,
        guidance_scale = request.guidance_scale,
        num_inference_steps = request.num_inference_steps,
        height = request.height,
        width = request.width,
        "Generating image"
    );

    let image = match state.gateway.generate(request).await {
        Ok(image) => image,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Image generation failed");
            return Err(e);
        }
    };

    let bytes = png::encode_blocking(image).await.map_err(|e| {
        error!(request_id = %request_id, error = %e, "Image encoding failed");
        e
    })?;

    info!(request_id = %request_id, bytes = bytes.len(), "Image generated successfully");
    Ok(ImageResponse::png(bytes).with_request_id(request_id).into_response())
}

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: String,
    pub queue: ExecutorStats,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        engine: state.gateway.engine_name().to_string(),
        queue: state.gateway.stats(),
    })
}
