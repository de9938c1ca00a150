//! Diffusion Gateway
//!
//! HTTP front end for a single text-to-image engine. Requests are accepted
//! concurrently and handed to a one-thread executor, so the engine never
//! runs more than one generation at a time.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod queue;
pub mod response;

pub use error::{AppError, Result};

use gateway::GenerationGateway;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: config::Settings,
    pub gateway: GenerationGateway,
}
