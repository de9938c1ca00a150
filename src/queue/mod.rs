//! Queue module - Serialized single-worker executor

pub mod executor;

pub use executor::{ExecutorError, ExecutorStats, SerializedExecutor, TaskError, TaskHandle};
