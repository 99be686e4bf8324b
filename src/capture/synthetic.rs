//! Synthetic hand motion for simulations and end-to-end tests.
//!
//! Generates a deterministic (seeded) stream of 21-point hands that start
//! open, then repeatedly close, hold, open and hold again. Geometry is laid
//! out like an image-space detector would report it: wrist near the bottom
//! of the frame, fingers fanned upwards, y growing downwards.
//!
//! Fingertip spread is expressed in palm lengths (wrist -> middle-finger
//! base): an open palm reaches ~2.0, a fist ~0.9.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Frame, LandmarkSource, FRAME_INTERVAL_MS};
use crate::analysis::landmarks::{HandLandmarks, Landmark, LANDMARK_COUNT, WRIST};
use crate::error::CaptureError;

const OPEN_SPREAD: f32 = 2.0;
const CLOSED_SPREAD: f32 = 0.9;

/// Fan angle of each finger (thumb .. pinky), radians from vertical
const FINGER_ANGLES: [f32; 5] = [-0.9, -0.3, 0.0, 0.3, 0.6];

/// Description of a synthetic session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticSpec {
    /// Number of close/open cycles after the lead-in
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Open-hand frames before the first cycle
    #[serde(default = "default_lead_in_frames")]
    pub lead_in_frames: usize,
    /// Frames spent moving between open and closed
    #[serde(default = "default_ramp_frames")]
    pub ramp_frames: usize,
    /// Frames held in each pose
    #[serde(default = "default_hold_frames")]
    pub hold_frames: usize,
    /// Probability that a frame has no detected hand
    #[serde(default = "default_dropout_rate")]
    pub dropout_rate: f32,
    /// Max per-coordinate noise, image units
    #[serde(default = "default_jitter")]
    pub jitter: f32,
    /// Wrist -> middle-finger-base distance, image units
    #[serde(default = "default_palm_size")]
    pub palm_size: f32,
}

fn default_cycles() -> u32 {
    3
}

fn default_seed() -> u64 {
    0x5A5A_FFF0
}

fn default_lead_in_frames() -> usize {
    30
}

fn default_ramp_frames() -> usize {
    6
}

fn default_hold_frames() -> usize {
    45
}

fn default_dropout_rate() -> f32 {
    0.02
}

fn default_jitter() -> f32 {
    0.003
}

fn default_palm_size() -> f32 {
    0.22
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            seed: default_seed(),
            lead_in_frames: default_lead_in_frames(),
            ramp_frames: default_ramp_frames(),
            hold_frames: default_hold_frames(),
            dropout_rate: default_dropout_rate(),
            jitter: default_jitter(),
            palm_size: default_palm_size(),
        }
    }
}

impl SyntheticSpec {
    fn cycle_len(&self) -> usize {
        2 * (self.ramp_frames + self.hold_frames)
    }

    pub fn total_frames(&self) -> usize {
        self.lead_in_frames + self.cycles as usize * self.cycle_len()
    }

    /// How closed the hand is at `index`: 0.0 open .. 1.0 fist
    pub fn curl_at(&self, index: usize) -> f32 {
        if index < self.lead_in_frames {
            return 0.0;
        }
        let ramp = self.ramp_frames.max(1) as f32;
        let j = (index - self.lead_in_frames) % self.cycle_len().max(1);
        let closing_end = self.ramp_frames;
        let closed_end = closing_end + self.hold_frames;
        let opening_end = closed_end + self.ramp_frames;

        if j < closing_end {
            (j + 1) as f32 / ramp
        } else if j < closed_end {
            1.0
        } else if j < opening_end {
            1.0 - (j - closed_end + 1) as f32 / ramp
        } else {
            0.0
        }
    }
}

/// Seeded generator of open/close hand motion.
pub struct SyntheticHandSource {
    spec: SyntheticSpec,
    rng: StdRng,
    index: usize,
}

impl SyntheticHandSource {
    pub fn new(spec: SyntheticSpec) -> Self {
        let rng = StdRng::seed_from_u64(spec.seed);
        Self {
            spec,
            rng,
            index: 0,
        }
    }

    pub fn spec(&self) -> &SyntheticSpec {
        &self.spec
    }

    fn noise(&mut self) -> f32 {
        let j = self.spec.jitter.abs();
        if j == 0.0 {
            0.0
        } else {
            self.rng.gen_range(-j..=j)
        }
    }

    fn hand(&mut self, curl: f32) -> HandLandmarks {
        let palm = self.spec.palm_size;
        let spread = OPEN_SPREAD + (CLOSED_SPREAD - OPEN_SPREAD) * curl;
        let drift = 0.03 * (self.index as f32 * 0.05).sin();
        let wrist = Landmark::new(0.5 + drift, 0.8, 0.0);

        let mut points = [wrist; LANDMARK_COUNT];
        for (finger, angle) in FINGER_ANGLES.iter().enumerate() {
            let (dx, dy) = (angle.sin(), -angle.cos());
            let base = if finger == 0 { 0.4 * palm } else { palm };
            let tip = spread * palm;
            for joint in 0..4 {
                let t = joint as f32 / 3.0;
                let r = base + (tip - base) * t;
                points[finger * 4 + 1 + joint] =
                    Landmark::new(wrist.x + dx * r, wrist.y + dy * r, -0.01 * curl * t);
            }
        }

        for (index, point) in points.iter_mut().enumerate() {
            if index == WRIST {
                continue;
            }
            *point = Landmark::new(
                point.x + self.noise(),
                point.y + self.noise(),
                point.z + self.noise(),
            );
        }

        HandLandmarks::new(points)
    }
}

impl LandmarkSource for SyntheticHandSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.index >= self.spec.total_frames() {
            return Ok(None);
        }

        let timestamp_ms = self.index as u64 * FRAME_INTERVAL_MS;
        let dropped = self.spec.dropout_rate > 0.0 && self.rng.gen::<f32>() < self.spec.dropout_rate;
        let frame = if dropped {
            Frame::empty(timestamp_ms)
        } else {
            let curl = self.spec.curl_at(self.index);
            Frame::with_hand(timestamp_ms, self.hand(curl))
        };

        self.index += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
