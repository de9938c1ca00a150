//! Engine module - Generation capability, built-in and remote engines

pub mod procedural;
pub mod remote;
pub mod traits;

pub use traits::{
    EngineError, GeneratedImage, GenerationEngine, GenerationRequest, RESOLUTION_STRIDE,
};

use tracing::info;

use crate::config::{EngineConfig, EngineKind};

/// Construct the configured engine.
///
/// Called on the executor thread so that model loading and any blocking
/// clients never touch the async runtime.
pub fn build(config: &EngineConfig) -> Result<Box<dyn GenerationEngine>, EngineError> {
    let engine: Box<dyn GenerationEngine> = match config.kind {
        EngineKind::Procedural => Box::new(procedural::ProceduralEngine::new(config.model.clone())),
        EngineKind::Remote => Box::new(remote::RemoteEngine::new(config)?),
    };

    info!(engine = %engine.name(), model = %config.model, "Generation engine ready");
    Ok(engine)
}
