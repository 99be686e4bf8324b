//! Configuration for the gesture pipeline
//!
//! This module provides configuration loading from JSON files so that
//! thresholds, window length and relay settings can be tuned without
//! recompilation. Every value is consumed once when a pipeline is
//! constructed; there is no hot reload.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{log_config_error, ConfigError};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Gesture decision parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Number of frames fed to the classifier
    pub window_size: usize,
    /// Ordered label names matching the classifier's output indices
    pub labels: Vec<String>,
    /// Minimum confidence for IDLE -> HOLDING (exclusive)
    pub grab_conf: f32,
    /// Minimum confidence for HOLDING -> IDLE (exclusive)
    pub drop_conf: f32,
    /// Openness must be strictly below this to accept a grab
    pub grab_open_max: f32,
    /// Openness must be strictly above this to accept a drop
    pub drop_open_min: f32,
    /// Minimum seconds between two accepted transitions
    pub cooldown_secs: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            labels: vec!["grab".to_string(), "drop".to_string()],
            grab_conf: 0.55,
            // Dropping an object by accident is worse than a late release
            drop_conf: 0.75,
            grab_open_max: 0.35,
            drop_open_min: 0.40,
            cooldown_secs: 1.0,
        }
    }
}

impl GestureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }
}

/// Classifier invocation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Upper bound on a single classifier call; 0 calls the model inline
    /// without a deadline
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { timeout_ms: 200 }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Outbound event delivery parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Session (room) identifier stamped on every outbound message
    pub session_id: String,
    /// Upper bound on a single sink send
    pub send_timeout_ms: u64,
    /// Pending messages held for the dispatcher before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            session_id: "demo-room".to_string(),
            send_timeout_ms: 500,
            queue_capacity: 64,
        }
    }
}

impl RelayConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Missing sections and fields fall back to their defaults, but a file
    /// that cannot be read or parsed is an error: the caller asked for it
    /// explicitly. The loaded configuration is validated before returning.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let display = path.as_ref().display().to_string();
        match Self::read_validated(path.as_ref(), &display) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {}", display);
                Ok(config)
            }
            Err(err) => {
                log_config_error(&err, "AppConfig::load_from_file");
                Err(err)
            }
        }
    }

    fn read_validated(path: &Path, display: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: display.to_string(),
            reason: err.to_string(),
        })?;
        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
                path: display.to_string(),
                reason: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise return validated defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                log::info!("[Config] No config file given, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check every recognized option against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gesture = &self.gesture;
        if gesture.window_size == 0 {
            return Err(ConfigError::InvalidWindowSize {
                size: gesture.window_size,
            });
        }

        check_confidence("grab_conf", gesture.grab_conf)?;
        check_confidence("drop_conf", gesture.drop_conf)?;
        check_non_negative("grab_open_max", gesture.grab_open_max as f64)?;
        check_non_negative("drop_open_min", gesture.drop_open_min as f64)?;
        check_non_negative("cooldown_secs", gesture.cooldown_secs)?;

        crate::analysis::classifier::LabelSet::new(&gesture.labels)?;

        if self.relay.queue_capacity == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "queue_capacity",
                value: 0.0,
            });
        }

        Ok(())
    }
}

fn check_confidence(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            name,
            value: value as f64,
        })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}
