//! Landmark source abstractions.
//!
//! The pipeline never talks to a camera or a landmark detector directly. It
//! pulls [`Frame`]s from a [`LandmarkSource`]; concrete sources replay
//! recordings, serve scripted frames in tests, generate synthetic hand
//! motion, or wrap an external grabber + detector pair.
//!
//! Sources are held through a [`CaptureSession`], which guarantees that
//! `release()` runs exactly once on every exit path.

use serde::{Deserialize, Serialize};

use crate::analysis::landmarks::HandLandmarks;
use crate::error::CaptureError;

pub mod detector;
pub mod recorded;
pub mod scripted;
pub mod synthetic;

pub use detector::{DetectorSource, FrameGrabber, HandDetector};
pub use recorded::RecordedSource;
pub use scripted::ScriptedSource;
pub use synthetic::{SyntheticHandSource, SyntheticSpec};

/// Nominal spacing between camera frames (~30 fps).
pub const FRAME_INTERVAL_MS: u64 = 33;

/// One observation from the landmark detector.
///
/// Serialized as one line of a recording:
/// `{"timestamp_ms": 33, "landmarks": [[x, y, z], ...]}` with `null`
/// landmarks when no hand was detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic, non-decreasing within a session
    pub timestamp_ms: u64,
    #[serde(rename = "landmarks", default)]
    pub hand: Option<HandLandmarks>,
}

impl Frame {
    pub fn with_hand(timestamp_ms: u64, hand: HandLandmarks) -> Self {
        Self {
            timestamp_ms,
            hand: Some(hand),
        }
    }

    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            hand: None,
        }
    }
}

/// Producer of landmark frames for one session.
pub trait LandmarkSource: Send {
    /// Next frame, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Release camera/detector resources. Called once by [`CaptureSession`].
    fn release(&mut self) {}

    fn name(&self) -> &str;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Scoped ownership of a landmark source.
///
/// The source is released when the session is dropped, whether the
/// pipeline stopped normally, hit a fatal error or panicked.
pub struct CaptureSession<S: LandmarkSource> {
    source: S,
    released: bool,
}

impl<S: LandmarkSource> CaptureSession<S> {
    pub fn new(source: S) -> Self {
        log::info!("[Capture] Session opened on source '{}'", source.name());
        Self {
            source,
            released: false,
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Err(CaptureError::Closed);
        }
        self.source.next_frame()
    }

    /// Release the source early; later reads fail with `Closed`.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            log::info!("[Capture] Source '{}' released", self.source.name());
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: LandmarkSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::landmarks::{Landmark, LANDMARK_COUNT};

    #[test]
    fn test_frame_recording_format() {
        let hand = HandLandmarks::new([Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT]);
        let frame = Frame::with_hand(66, hand);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["timestamp_ms"], 66);
        assert_eq!(json["landmarks"].as_array().map(Vec::len), Some(21));

        let empty: Frame = serde_json::from_str(r#"{"timestamp_ms": 99, "landmarks": null}"#).unwrap();
        assert_eq!(empty, Frame::empty(99));

        let missing: Frame = serde_json::from_str(r#"{"timestamp_ms": 5}"#).unwrap();
        assert!(missing.hand.is_none());
    }

    #[test]
    fn test_session_releases_on_drop() {
        let source = ScriptedSource::new(vec![Frame::empty(0)]);
        let released = source.released_flag();
        {
            let mut session = CaptureSession::new(source);
            assert!(session.next_frame().unwrap().is_some());
        }
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_released_session_refuses_reads() {
        let source = ScriptedSource::new(vec![Frame::empty(0), Frame::empty(33)]);
        let released = source.released_flag();
        let mut session = CaptureSession::new(source);
        session.release();
        session.release();

        assert!(session.is_released());
        assert_eq!(session.next_frame(), Err(CaptureError::Closed));
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }
}
