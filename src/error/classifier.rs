// Classifier error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Classifier error code constants
///
/// Error code range: 2001-2005
pub struct ClassifierErrorCodes {}

impl ClassifierErrorCodes {
    /// Probability vector length does not match the label set
    pub const OUTPUT_LENGTH: i32 = 2001;

    /// Probability vector contains NaN or infinity
    pub const NON_FINITE_PROBABILITY: i32 = 2002;

    /// Model did not answer within the inference timeout
    pub const TIMEOUT: i32 = 2003;

    /// Model is still working on an earlier window
    pub const BUSY: i32 = 2004;

    /// Model backend is gone or failed internally
    pub const UNAVAILABLE: i32 = 2005;
}

/// Log a classifier error with structured context
///
/// Classifier failures are frame-scoped, so they are logged at warn level.
pub fn log_classifier_error(err: &ClassifierError, context: &str) {
    warn!(
        "Classifier error in {}: code={}, component=ClassificationAdapter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Classification errors
///
/// Every variant invalidates the decision for one frame only; the window
/// and the gesture state are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Probability vector has the wrong length
    OutputLength { expected: usize, actual: usize },

    /// Probability at `index` is NaN or infinite
    NonFiniteProbability { index: usize },

    /// Inference exceeded the configured timeout
    Timeout { timeout_ms: u64 },

    /// Previous inference still running
    Busy,

    /// Model backend failed
    Unavailable { reason: String },
}

impl ErrorCode for ClassifierError {
    fn code(&self) -> i32 {
        match self {
            ClassifierError::OutputLength { .. } => ClassifierErrorCodes::OUTPUT_LENGTH,
            ClassifierError::NonFiniteProbability { .. } => {
                ClassifierErrorCodes::NON_FINITE_PROBABILITY
            }
            ClassifierError::Timeout { .. } => ClassifierErrorCodes::TIMEOUT,
            ClassifierError::Busy => ClassifierErrorCodes::BUSY,
            ClassifierError::Unavailable { .. } => ClassifierErrorCodes::UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifierError::OutputLength { expected, actual } => format!(
                "Classifier returned {} probabilities, expected {}",
                actual, expected
            ),
            ClassifierError::NonFiniteProbability { index } => {
                format!("Classifier probability at index {} is not finite", index)
            }
            ClassifierError::Timeout { timeout_ms } => {
                format!("Classifier did not answer within {}ms", timeout_ms)
            }
            ClassifierError::Busy => "Classifier still busy with a previous window".to_string(),
            ClassifierError::Unavailable { reason } => {
                format!("Classifier unavailable: {}", reason)
            }
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassifierError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ClassifierError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_error_codes() {
        assert_eq!(
            ClassifierError::OutputLength {
                expected: 2,
                actual: 3
            }
            .code(),
            2001
        );
        assert_eq!(
            ClassifierError::NonFiniteProbability { index: 1 }.code(),
            2002
        );
        assert_eq!(ClassifierError::Timeout { timeout_ms: 200 }.code(), 2003);
        assert_eq!(ClassifierError::Busy.code(), 2004);
        assert_eq!(
            ClassifierError::Unavailable {
                reason: "worker exited".to_string()
            }
            .code(),
            2005
        );
    }

    #[test]
    fn test_classifier_error_display() {
        let err = ClassifierError::OutputLength {
            expected: 2,
            actual: 3,
        };
        let display = format!("{}", err);
        assert!(display.contains("ClassifierError"));
        assert!(display.contains("2001"));
        assert!(display.contains("returned 3 probabilities, expected 2"));
    }

    #[test]
    fn test_error_code_trait_object() {
        let err: &dyn ErrorCode = &ClassifierError::Busy;
        assert_eq!(err.code(), ClassifierErrorCodes::BUSY);
    }
}
