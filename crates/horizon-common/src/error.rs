//! Error types for Horizon.

use thiserror::Error;

/// Top-level error type for Horizon operations.
#[derive(Debug, Error)]
pub enum HorizonError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Terrain streaming errors
    #[error("Terrain error: {0}")]
    Terrain(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The configuration could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A configuration value is out of range
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type alias for Horizon operations.
pub type HorizonResult<T> = Result<T, HorizonError>;
