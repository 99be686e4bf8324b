// Classification adapter - wraps the external gesture model
//
// The model itself is opaque: it takes a full window of normalized feature
// vectors and returns one probability per label. This module validates that
// output and reduces it to the top label and its confidence.
//
// Validation rules:
// - output length must equal the label set length
// - every probability must be finite (they need not sum to 1)
// - ties resolve to the lowest label index, matching numpy-style argmax

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use crate::error::{ClassifierError, ConfigError};

/// Gesture meaning of a classifier label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureLabel {
    /// Closing hand, picks an object up
    Grab,
    /// Opening hand, releases the held object
    Drop,
    /// Any extra label the model knows about; never triggers a transition
    Unknown,
}

impl GestureLabel {
    fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "grab" => GestureLabel::Grab,
            "drop" => GestureLabel::Drop,
            _ => GestureLabel::Unknown,
        }
    }
}

/// Ordered label names matching the model's output indices
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    names: Vec<String>,
    labels: Vec<GestureLabel>,
}

impl LabelSet {
    /// Build a label set, requiring exactly one grab and one drop entry
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let labels: Vec<GestureLabel> = names.iter().map(|n| GestureLabel::from_name(n)).collect();

        for (wanted, name) in [(GestureLabel::Grab, "grab"), (GestureLabel::Drop, "drop")] {
            let count = labels.iter().filter(|&&label| label == wanted).count();
            if count != 1 {
                return Err(ConfigError::InvalidLabels {
                    reason: format!("expected exactly one '{}' label, found {}", name, count),
                });
            }
        }

        Ok(Self { names, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> GestureLabel {
        self.labels
            .get(index)
            .copied()
            .unwrap_or(GestureLabel::Unknown)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            names: vec!["grab".to_string(), "drop".to_string()],
            labels: vec![GestureLabel::Grab, GestureLabel::Drop],
        }
    }
}

/// Top label of one classification together with its probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: GestureLabel,
    /// Index of the winning label in the model output
    pub label_index: usize,
    /// Probability of the winning label (0.0-1.0)
    pub confidence: f32,
}

/// External gesture model
///
/// Implementations receive the window oldest frame first and return one
/// probability per label. Inference may be slow; wrap the model in
/// [`super::inference::TimeoutModel`] to bound it.
pub trait GestureModel: Send {
    fn predict(&mut self, window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError>;
}

impl<M: GestureModel + ?Sized> GestureModel for Box<M> {
    fn predict(&mut self, window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError> {
        (**self).predict(window)
    }
}

/// Index and value of the maximum, first index winning ties
///
/// Returns `None` for an empty slice.
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((index, p)),
        }
    }
    best
}

/// Turns raw model output into a [`ClassificationResult`]
pub struct ClassificationAdapter {
    model: Box<dyn GestureModel>,
    labels: LabelSet,
}

impl ClassificationAdapter {
    pub fn new(model: Box<dyn GestureModel>, labels: LabelSet) -> Self {
        Self { model, labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classify a full window
    ///
    /// No retries: any model failure or malformed output is returned to the
    /// caller, which skips the decision for this frame.
    pub fn classify(
        &mut self,
        window: &[FeatureVector],
    ) -> Result<ClassificationResult, ClassifierError> {
        let probabilities = self.model.predict(window)?;
        self.interpret(&probabilities)
    }

    fn interpret(&self, probabilities: &[f32]) -> Result<ClassificationResult, ClassifierError> {
        if probabilities.len() != self.labels.len() {
            return Err(ClassifierError::OutputLength {
                expected: self.labels.len(),
                actual: probabilities.len(),
            });
        }

        if let Some(index) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(ClassifierError::NonFiniteProbability { index });
        }

        let (label_index, confidence) =
            argmax(probabilities).ok_or(ClassifierError::OutputLength {
                expected: self.labels.len(),
                actual: 0,
            })?;

        Ok(ClassificationResult {
            label: self.labels.label(label_index),
            label_index,
            confidence,
        })
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
