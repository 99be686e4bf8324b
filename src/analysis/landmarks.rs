// Hand landmark types
//
// A detected hand is exactly 21 keypoints in a fixed anatomical order.
// Coordinates are whatever the external detector reports (normalized image
// space for MediaPipe-style detectors); nothing here assumes a unit.

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Number of keypoints per detected hand
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;

/// The five fingertips, thumb first
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// One 3-D keypoint
///
/// Serialized as a bare `[x, y, z]` triple to keep recordings compact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise difference `self - other`
    pub fn sub(&self, other: &Landmark) -> Landmark {
        Landmark::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Euclidean length of the point as a vector from the origin
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        self.sub(other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from(value: [f32; 3]) -> Self {
        Landmark::new(value[0], value[1], value[2])
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(value: Landmark) -> Self {
        [value.x, value.y, value.z]
    }
}

/// Landmarks of a single detected hand in one frame
///
/// Immutable once produced by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a detector's keypoint list, rejecting wrong counts and
    /// non-finite coordinates
    pub fn from_slice(points: &[Landmark]) -> Result<Self, CaptureError> {
        let points: [Landmark; LANDMARK_COUNT] =
            points
                .try_into()
                .map_err(|_| CaptureError::InvalidLandmarkCount {
                    expected: LANDMARK_COUNT,
                    actual: points.len(),
                })?;
        let hand = Self { points };
        hand.check_finite()?;
        Ok(hand)
    }

    /// Index of the first keypoint with a NaN or infinite coordinate
    pub fn first_non_finite(&self) -> Option<usize> {
        self.points.iter().position(|point| !point.is_finite())
    }

    pub fn check_finite(&self) -> Result<(), CaptureError> {
        match self.first_non_finite() {
            Some(index) => Err(CaptureError::NonFiniteLandmark { index }),
            None => Ok(()),
        }
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn wrist(&self) -> Landmark {
        self.points[WRIST]
    }

    /// Apply `f` to every point, producing a new hand
    pub fn map(&self, f: impl Fn(&Landmark) -> Landmark) -> HandLandmarks {
        let mut points = self.points;
        for point in points.iter_mut() {
            *point = f(point);
        }
        HandLandmarks { points }
    }
}
