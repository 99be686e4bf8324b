// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3005
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Window size must be at least one frame
    pub const INVALID_WINDOW_SIZE: i32 = 3001;

    /// A confidence, openness or cooldown value is out of range
    pub const INVALID_THRESHOLD: i32 = 3002;

    /// Label set does not name exactly one grab and one drop label
    pub const INVALID_LABELS: i32 = 3003;

    /// Config file could not be read
    pub const IO: i32 = 3004;

    /// Config file is not valid JSON for the expected schema
    pub const PARSE: i32 = 3005;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=AppConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors surfaced before a pipeline is constructed
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidWindowSize { size: usize },
    InvalidThreshold { name: &'static str, value: f64 },
    InvalidLabels { reason: String },
    Io { path: String, reason: String },
    Parse { path: String, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidWindowSize { .. } => ConfigErrorCodes::INVALID_WINDOW_SIZE,
            ConfigError::InvalidThreshold { .. } => ConfigErrorCodes::INVALID_THRESHOLD,
            ConfigError::InvalidLabels { .. } => ConfigErrorCodes::INVALID_LABELS,
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidWindowSize { size } => {
                format!("Window size must be at least 1 (got {})", size)
            }
            ConfigError::InvalidThreshold { name, value } => {
                format!("Threshold {} is out of range (got {})", name, value)
            }
            ConfigError::InvalidLabels { reason } => format!("Invalid label set: {}", reason),
            ConfigError::Io { path, reason } => {
                format!("Failed to read config {}: {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                format!("Failed to parse config {}: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
