//! Gateway module - Async bridge between request handlers and the engine

pub mod generation;

pub use generation::{EngineExecutor, GenerationGateway};
