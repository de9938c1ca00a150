//! Configuration module

mod settings;

pub use settings::{
    EngineConfig, EngineKind, LoggingConfig, ServerConfig, Settings, CONFIG_PATH_ENV,
};
