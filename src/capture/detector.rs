//! Adapter from an external frame grabber + hand landmark detector.
//!
//! Camera capture and landmark extraction live outside this crate. A host
//! application implements [`FrameGrabber`] and [`HandDetector`] over its own
//! camera and model; [`DetectorSource`] stamps each grabbed image with a
//! monotonic timestamp (advancing by [`FRAME_INTERVAL_MS`]) and turns the
//! detector's keypoints into a [`Frame`].

use super::{Frame, LandmarkSource, FRAME_INTERVAL_MS};
use crate::analysis::landmarks::{HandLandmarks, Landmark};
use crate::error::CaptureError;

/// Source of camera images
pub trait FrameGrabber: Send {
    type Image;

    /// Next image, or `Ok(None)` when the stream has ended
    fn grab(&mut self) -> Result<Option<Self::Image>, CaptureError>;

    fn release(&mut self) {}
}

/// Video-mode hand landmark detector
///
/// Requires non-decreasing timestamps within a session. Returns the
/// keypoints of at most one hand.
pub trait HandDetector: Send {
    type Image;

    fn detect(
        &mut self,
        image: &Self::Image,
        timestamp_ms: u64,
    ) -> Result<Option<Vec<Landmark>>, CaptureError>;

    fn release(&mut self) {}
}

pub struct DetectorSource<G, D>
where
    G: FrameGrabber,
    D: HandDetector<Image = G::Image>,
{
    grabber: G,
    detector: D,
    next_timestamp_ms: u64,
}

impl<G, D> DetectorSource<G, D>
where
    G: FrameGrabber,
    D: HandDetector<Image = G::Image>,
{
    pub fn new(grabber: G, detector: D) -> Self {
        Self {
            grabber,
            detector,
            next_timestamp_ms: 0,
        }
    }
}

impl<G, D> LandmarkSource for DetectorSource<G, D>
where
    G: FrameGrabber,
    D: HandDetector<Image = G::Image>,
{
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(image) = self.grabber.grab()? else {
            return Ok(None);
        };

        let timestamp_ms = self.next_timestamp_ms;
        self.next_timestamp_ms += FRAME_INTERVAL_MS;

        let hand = match self.detector.detect(&image, timestamp_ms)? {
            Some(points) => Some(HandLandmarks::from_slice(&points)?),
            None => None,
        };

        Ok(Some(Frame { timestamp_ms, hand }))
    }

    fn release(&mut self) {
        self.detector.release();
        self.grabber.release();
    }

    fn name(&self) -> &str {
        "detector"
    }
}
