//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "SD_GATEWAY_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which engine implementation to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Procedural,
    Remote,
}

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    /// Model weights identifier passed to the engine
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the inference server (remote engine only)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_model() -> String {
    "runwayml/stable-diffusion-v1-5".to_string()
}

fn default_timeout() -> u64 {
    300000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            model: default_model(),
            endpoint: None,
            timeout_ms: default_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file and environment variables
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", 8000)?
            .set_default("engine.kind", "procedural")?
            .set_default("engine.model", default_model())?
            .set_default("engine.timeout_ms", 300000)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Load from configuration file
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (prefixed with SD_GATEWAY__)
            .add_source(
                Environment::with_prefix("SD_GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(config_error("Server port cannot be 0"));
        }

        if self.engine.model.trim().is_empty() {
            return Err(config_error("Engine model cannot be empty"));
        }

        if self.engine.kind == EngineKind::Remote
            && self.engine.endpoint.as_deref().map_or(true, |e| e.trim().is_empty())
        {
            return Err(config_error("Remote engine requires `engine.endpoint`"));
        }

        if self.engine.timeout_ms == 0 {
            return Err(config_error("Engine timeout_ms must be greater than 0"));
        }

        if !["json", "pretty", "text"].contains(&self.logging.format.as_str()) {
            return Err(config_error(&format!(
                "Invalid log format '{}'. Must be 'json', 'pretty' or 'text'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn config_error(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}
