// Built-in gesture models
//
// The production classifier is an external learned model. These
// implementations stand in for it where no model is available:
//
// - ScriptedModel: replays queued probability vectors (deterministic tests)
// - HeuristicModel: rule-based fingertip-spread scoring for replays and demos

use std::collections::VecDeque;

use super::classifier::GestureModel;
use super::features::FeatureVector;
use super::landmarks::FINGERTIPS;
use crate::error::ClassifierError;

/// Replays a fixed sequence of model outputs
///
/// Once the queue is exhausted the last output repeats. An empty script
/// reports the model as unavailable.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    outputs: VecDeque<Result<Vec<f32>, ClassifierError>>,
    last: Option<Result<Vec<f32>, ClassifierError>>,
    calls: usize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `probabilities`
    pub fn constant(probabilities: Vec<f32>) -> Self {
        let mut model = Self::new();
        model.push(probabilities);
        model
    }

    pub fn push(&mut self, probabilities: Vec<f32>) -> &mut Self {
        self.outputs.push_back(Ok(probabilities));
        self
    }

    pub fn push_error(&mut self, err: ClassifierError) -> &mut Self {
        self.outputs.push_back(Err(err));
        self
    }

    /// Number of predictions served so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl GestureModel for ScriptedModel {
    fn predict(&mut self, _window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError> {
        self.calls += 1;
        if let Some(next) = self.outputs.pop_front() {
            self.last = Some(next);
        }
        self.last
            .clone()
            .unwrap_or_else(|| {
                Err(ClassifierError::Unavailable {
                    reason: "script is empty".to_string(),
                })
            })
    }
}

/// Rule-based grab/drop scoring from fingertip spread
///
/// Spread is the mean wrist-to-fingertip distance in normalized units
/// (multiples of the wrist -> middle-finger-base length), averaged over the
/// newest `recent_frames` of the window. A fist sits near 1.0, an open palm
/// near 2.0. The grab probability is a logistic curve centred on `pivot`:
///
///   p_grab = 1 / (1 + exp(-steepness * (pivot - spread)))
///
/// Output order follows the default label set: `[grab, drop]`.
#[derive(Debug, Clone)]
pub struct HeuristicModel {
    pub pivot: f32,
    pub steepness: f32,
    pub recent_frames: usize,
}

impl Default for HeuristicModel {
    fn default() -> Self {
        Self {
            pivot: 1.35,
            steepness: 6.0,
            recent_frames: 5,
        }
    }
}

impl HeuristicModel {
    fn spread(frame: &FeatureVector) -> f32 {
        let total: f32 = FINGERTIPS
            .iter()
            .map(|&tip| {
                let [x, y, z] = frame.landmark(tip);
                (x * x + y * y + z * z).sqrt()
            })
            .sum();
        total / FINGERTIPS.len() as f32
    }
}

impl GestureModel for HeuristicModel {
    fn predict(&mut self, window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError> {
        let take = self.recent_frames.max(1).min(window.len());
        if take == 0 {
            return Err(ClassifierError::Unavailable {
                reason: "empty window".to_string(),
            });
        }

        let recent = &window[window.len() - take..];
        let spread = recent.iter().map(Self::spread).sum::<f32>() / take as f32;
        let grab = 1.0 / (1.0 + (-self.steepness * (self.pivot - spread)).exp());

        Ok(vec![grab, 1.0 - grab])
    }
}
