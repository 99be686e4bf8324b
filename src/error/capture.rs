// Capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture error code constants
///
/// Single source of truth for landmark source error codes.
///
/// Error code range: 1001-1006
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Source could not be opened (camera, detector model, recording file)
    pub const INIT_FAILED: i32 = 1001;

    /// Reading the next frame failed
    pub const READ_FAILED: i32 = 1002;

    /// Frame timestamp went backwards within a session
    pub const TIMESTAMP_REGRESSION: i32 = 1003;

    /// Detector produced a hand with the wrong number of keypoints
    pub const INVALID_LANDMARK_COUNT: i32 = 1004;

    /// Source was used after being released
    pub const CLOSED: i32 = 1005;

    /// Detector produced a keypoint with a NaN or infinite coordinate
    pub const NON_FINITE_LANDMARK: i32 = 1006;
}

/// Log a capture error with structured context
///
/// Emits one line carrying the numeric code, the component and the
/// human-readable message.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=LandmarkSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Landmark source errors
///
/// `InitFailed` is fatal to a pipeline; `TimestampRegression`,
/// `InvalidLandmarkCount` and `NonFiniteLandmark` only invalidate a single
/// frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Source could not be opened
    InitFailed { reason: String },

    /// Reading the next frame failed
    ReadFailed { reason: String },

    /// Frame timestamp is older than the previous one
    TimestampRegression { previous_ms: u64, current_ms: u64 },

    /// Detector output did not contain exactly 21 keypoints
    InvalidLandmarkCount { expected: usize, actual: usize },

    /// Source was used after release
    Closed,

    /// A keypoint coordinate was NaN or infinite
    NonFiniteLandmark { index: usize },
}

impl CaptureError {
    /// Whether the error only invalidates the current frame
    pub fn is_frame_scoped(&self) -> bool {
        matches!(
            self,
            CaptureError::TimestampRegression { .. }
                | CaptureError::InvalidLandmarkCount { .. }
                | CaptureError::NonFiniteLandmark { .. }
        )
    }
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::InitFailed { .. } => CaptureErrorCodes::INIT_FAILED,
            CaptureError::ReadFailed { .. } => CaptureErrorCodes::READ_FAILED,
            CaptureError::TimestampRegression { .. } => CaptureErrorCodes::TIMESTAMP_REGRESSION,
            CaptureError::InvalidLandmarkCount { .. } => CaptureErrorCodes::INVALID_LANDMARK_COUNT,
            CaptureError::Closed => CaptureErrorCodes::CLOSED,
            CaptureError::NonFiniteLandmark { .. } => CaptureErrorCodes::NON_FINITE_LANDMARK,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::InitFailed { reason } => {
                format!("Failed to open landmark source: {}", reason)
            }
            CaptureError::ReadFailed { reason } => format!("Failed to read frame: {}", reason),
            CaptureError::TimestampRegression {
                previous_ms,
                current_ms,
            } => format!(
                "Frame timestamp went backwards: {}ms after {}ms",
                current_ms, previous_ms
            ),
            CaptureError::InvalidLandmarkCount { expected, actual } => {
                format!("Expected {} landmarks, got {}", expected, actual)
            }
            CaptureError::Closed => "Landmark source already released".to_string(),
            CaptureError::NonFiniteLandmark { index } => {
                format!("Landmark {} has a non-finite coordinate", index)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CaptureError {}

/// Convert from std::io::Error to CaptureError
impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::ReadFailed {
            reason: err.to_string(),
        }
    }
}
