// Error types for the gesture relay
//
// This module defines error types for landmark capture, classification,
// configuration and event delivery, each carrying a numeric code so that
// callers and telemetry can handle failures programmatically.

mod capture;
mod classifier;
mod config;
mod sink;

pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};
pub use classifier::{log_classifier_error, ClassifierError, ClassifierErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use sink::{log_sink_error, SinkError, SinkErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the pipeline, the CLI and the relay surface.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
