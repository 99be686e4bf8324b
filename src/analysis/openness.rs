// Openness estimator - geometric hand-openness signal
//
// Mean Euclidean distance from the wrist to the five fingertips, measured
// on raw (non-normalized) landmarks. Normalization would erase the scale
// this signal depends on, so it must not be applied first.

use super::landmarks::{HandLandmarks, FINGERTIPS};

/// Compute hand openness from raw landmarks
///
/// Larger values mean a more open hand. Always >= 0 for finite input.
pub fn openness(hand: &HandLandmarks) -> f32 {
    let wrist = hand.wrist();
    let total: f32 = FINGERTIPS
        .iter()
        .map(|&tip| hand.points()[tip].distance(&wrist))
        .sum();
    total / FINGERTIPS.len() as f32
}
