//! Async gateway in front of the serialized engine executor

use std::time::Instant;

use tracing::debug;

use crate::engine::{EngineError, GeneratedImage, GenerationEngine, GenerationRequest};
use crate::error::{AppError, Result};
use crate::queue::{ExecutorError, ExecutorStats, SerializedExecutor, TaskError};

/// Executor that owns the process's single engine instance
pub type EngineExecutor = SerializedExecutor<Box<dyn GenerationEngine>>;

const EXECUTOR_NAME: &str = "engine-executor";

/// Bridges request handlers to the engine executor.
///
/// Any number of handlers may call [`GenerationGateway::generate`]
/// concurrently; each one suspends on its own task handle while the engine
/// processes queued requests one at a time.
pub struct GenerationGateway {
    executor: EngineExecutor,
    engine_name: String,
}

impl GenerationGateway {
    /// Wrap an already constructed engine
    pub fn new(engine: Box<dyn GenerationEngine>) -> Result<Self> {
        let engine_name = engine.name().to_string();
        let executor = SerializedExecutor::new(EXECUTOR_NAME, engine).map_err(executor_error)?;

        Ok(Self {
            executor,
            engine_name,
        })
    }

    /// Construct the engine on the executor thread, failing if `init` fails
    pub async fn start<F>(init: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<Box<dyn GenerationEngine>, EngineError> + Send + 'static,
    {
        let executor = SerializedExecutor::start(EXECUTOR_NAME, init)
            .await
            .map_err(executor_error)?;

        let engine_name = executor
            .submit(|engine: &mut Box<dyn GenerationEngine>| Ok(engine.name().to_string()))
            .map_err(executor_error)?
            .await
            .map_err(task_error)?;

        Ok(Self {
            executor,
            engine_name,
        })
    }

    /// Validate the request, queue it for the engine and wait for the image
    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;

        let handle = self
            .executor
            .submit(move |engine: &mut Box<dyn GenerationEngine>| {
                let started = Instant::now();
                let image = engine.render(&request)?;
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    width = image.width(),
                    height = image.height(),
                    "Engine render finished"
                );
                Ok(image)
            })
            .map_err(executor_error)?;

        handle.await.map_err(task_error)
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Stop accepting work and let queued requests finish
    pub async fn shutdown(&self) {
        self.executor.shutdown().await;
    }
}

fn executor_error(e: ExecutorError) -> AppError {
    match e {
        ExecutorError::Init(err) => AppError::Engine(err),
        other => AppError::Internal(other.to_string()),
    }
}

fn task_error(e: TaskError) -> AppError {
    match e {
        TaskError::Failed(err) => AppError::Engine(err),
        other => AppError::Internal(other.to_string()),
    }
}
