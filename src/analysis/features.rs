// Feature normalization - pose features for the gesture classifier
//
// Each frame's 21 landmarks are flattened into 63 numbers that are
// invariant to where the hand is in the image (translation) and how close
// it is to the camera (uniform scale):
//
// 1. Subtract the wrist from every landmark
// 2. Divide by the wrist -> middle-finger-base distance (landmark 9)
//
// A hand collapsed to a point has no usable scale; it is left unscaled
// instead of dividing by zero.

use serde::{Deserialize, Serialize};

use super::landmarks::{HandLandmarks, Landmark, LANDMARK_COUNT, MIDDLE_MCP};

/// Length of one normalized feature vector (21 landmarks x 3 coordinates)
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 3;

/// Translation- and scale-normalized pose of one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    #[serde(with = "feature_array")]
    values: [f32; FEATURE_LEN],
}

impl FeatureVector {
    pub fn from_array(values: [f32; FEATURE_LEN]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Normalized position of one landmark
    pub fn landmark(&self, index: usize) -> [f32; 3] {
        let base = index * 3;
        [
            self.values[base],
            self.values[base + 1],
            self.values[base + 2],
        ]
    }
}

/// Normalize one frame's landmarks
///
/// Pure function; never produces NaN or infinity from finite input.
pub fn normalize(hand: &HandLandmarks) -> FeatureVector {
    let wrist = hand.wrist();
    let relative = hand.map(|point| point.sub(&wrist));

    let scale = relative.points()[MIDDLE_MCP].norm();
    let scaled = if scale > 0.0 {
        relative.map(|point| Landmark::new(point.x / scale, point.y / scale, point.z / scale))
    } else {
        relative
    };

    let mut values = [0.0_f32; FEATURE_LEN];
    for (slot, point) in values.chunks_exact_mut(3).zip(scaled.points().iter()) {
        slot[0] = point.x;
        slot[1] = point.y;
        slot[2] = point.z;
    }

    FeatureVector { values }
}

// serde only derives arrays up to 32 elements
mod feature_array {
    use super::FEATURE_LEN;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f32; FEATURE_LEN], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[f32; FEATURE_LEN], D::Error> {
        let values = Vec::<f32>::deserialize(d)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"63 feature values"))
    }
}
