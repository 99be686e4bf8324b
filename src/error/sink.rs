// Event sink error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sink error code constants
///
/// Error code range: 4001-4004
pub struct SinkErrorCodes {}

impl SinkErrorCodes {
    /// Writing the message failed
    pub const IO: i32 = 4001;

    /// Sink or its channel has been closed
    pub const CLOSED: i32 = 4002;

    /// Sink did not accept the message within the send timeout
    pub const TIMEOUT: i32 = 4003;

    /// Outbound queue is full and the message was dropped
    pub const BACKPRESSURE: i32 = 4004;
}

/// Log a sink error with structured context
///
/// Delivery is best-effort; callers log and move on.
pub fn log_sink_error(err: &SinkError, context: &str) {
    error!(
        "Sink error in {}: code={}, component=EventEmitter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Event delivery errors
///
/// None of these roll back a committed gesture transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    Io { reason: String },
    Closed { sink: String },
    Timeout { sink: String, timeout_ms: u64 },
    Backpressure { capacity: usize },
}

impl ErrorCode for SinkError {
    fn code(&self) -> i32 {
        match self {
            SinkError::Io { .. } => SinkErrorCodes::IO,
            SinkError::Closed { .. } => SinkErrorCodes::CLOSED,
            SinkError::Timeout { .. } => SinkErrorCodes::TIMEOUT,
            SinkError::Backpressure { .. } => SinkErrorCodes::BACKPRESSURE,
        }
    }

    fn message(&self) -> String {
        match self {
            SinkError::Io { reason } => format!("Failed to write gesture message: {}", reason),
            SinkError::Closed { sink } => format!("Sink {} is closed", sink),
            SinkError::Timeout { sink, timeout_ms } => {
                format!("Sink {} did not accept message within {}ms", sink, timeout_ms)
            }
            SinkError::Backpressure { capacity } => format!(
                "Outbound queue full ({} messages), gesture message dropped",
                capacity
            ),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SinkError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Io {
            reason: err.to_string(),
        }
    }
}
