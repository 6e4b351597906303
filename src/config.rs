//! Configuration management for exec-demux.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::stream::{StreamConfig, DEFAULT_BUFFER_SIZE, DEFAULT_CHANNEL_CAPACITY};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stream decoding configuration.
    pub stream: StreamSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Stream decoding configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// Read size for payloads and TTY bursts.
    pub buffer_size: usize,
    /// Chunks buffered between decoder and writer in progressive mode.
    pub channel_capacity: usize,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable numbers are ignored and leave the current value in place.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = lookup("CONTAINER_EXEC_BUFFER_SIZE") {
            if let Ok(size) = size.parse() {
                self.stream.buffer_size = size;
            }
        }

        if let Some(capacity) = lookup("CONTAINER_EXEC_CHANNEL_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                self.stream.channel_capacity = capacity;
            }
        }

        if let Some(level) = lookup("CONTAINER_EXEC_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(size) = args.buffer_size {
            self.stream.buffer_size = size;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to the tuning passed to stream sessions.
    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        if self.stream.buffer_size == 0 {
            return Err(ConfigError::InvalidValue(
                "stream.buffer_size",
                self.stream.buffer_size.to_string(),
            ));
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "stream.channel_capacity",
                self.stream.channel_capacity.to_string(),
            ));
        }

        Ok(StreamConfig::new(
            self.stream.buffer_size,
            self.stream.channel_capacity,
        ))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Setting outside its valid range.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(key, value) => write!(f, "invalid value for {}: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}
