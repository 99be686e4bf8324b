// Gesture state machine - debounced two-state grab/drop decisions
//
// The machine is a hysteresis loop between IDLE and HOLDING. Three
// independent gates must all pass before a transition is accepted:
//
// 1. Cooldown: no transition of either kind while `now - last <= cooldown`
// 2. Confidence: per-direction thresholds (grab_conf vs drop_conf)
// 3. Openness: the hand's geometry must agree with the label
//    (grab needs openness < grab_open_max, drop needs openness > drop_open_min)
//
// Decision table, evaluated only once the window is full:
//
//   state    label  confidence        openness             result
//   IDLE     GRAB   > grab_conf       < grab_open_max      -> HOLDING, emit GRAB
//   HOLDING  DROP   > drop_conf       > drop_open_min      -> IDLE,    emit DROP
//   anything else                                          no change, no event
//
// The transition logic is a pure function over (state, thresholds, input);
// GestureStateMachine only owns the state between frames.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::classifier::{ClassificationResult, GestureLabel};
use crate::config::GestureConfig;

/// Current hand state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureState {
    /// Nothing held (initial state)
    #[default]
    Idle,
    /// An object is held
    Holding,
}

/// Event emitted on an accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureEvent {
    Grab,
    Drop,
}

impl GestureEvent {
    /// State the machine is in after this event
    pub fn target_state(self) -> GestureState {
        match self {
            GestureEvent::Grab => GestureState::Holding,
            GestureEvent::Drop => GestureState::Idle,
        }
    }

    /// Wire/console label
    pub fn as_str(self) -> &'static str {
        match self {
            GestureEvent::Grab => "GRAB",
            GestureEvent::Drop => "DROP",
        }
    }
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-direction gating thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct GestureThresholds {
    pub grab_conf: f32,
    pub drop_conf: f32,
    pub grab_open_max: f32,
    pub drop_open_min: f32,
    pub cooldown: Duration,
}

impl From<&GestureConfig> for GestureThresholds {
    fn from(config: &GestureConfig) -> Self {
        Self {
            grab_conf: config.grab_conf,
            drop_conf: config.drop_conf,
            grab_open_max: config.grab_open_max,
            drop_open_min: config.drop_open_min,
            cooldown: config.cooldown(),
        }
    }
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self::from(&GestureConfig::default())
    }
}

/// State carried between frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MachineState {
    pub gesture_state: GestureState,
    /// Time of the last accepted transition; `None` until the first one
    pub last_transition: Option<Instant>,
}

/// Per-frame input to the machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub classification: ClassificationResult,
    pub openness: f32,
    pub now: Instant,
}

/// Why a frame did not produce a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Still inside the cooldown after the previous transition
    Cooldown { remaining: Duration },
    /// Label already describes the current state (e.g. GRAB while HOLDING)
    AlreadyInState,
    /// Label has no gesture meaning
    UnknownLabel,
    /// Confidence did not exceed the threshold for this direction
    LowConfidence { confidence: f32, required: f32 },
    /// Hand geometry disagrees with the predicted label
    OpennessMismatch { openness: f32, limit: f32 },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Cooldown { .. } => "cooldown",
            Rejection::AlreadyInState => "already_in_state",
            Rejection::UnknownLabel => "unknown_label",
            Rejection::LowConfidence { .. } => "low_confidence",
            Rejection::OpennessMismatch { .. } => "openness_mismatch",
        }
    }
}

/// Decide whether `input` triggers a transition from `state`
///
/// Pure: does not touch any state.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn decide(
    state: &MachineState,
    thresholds: &GestureThresholds,
    input: &FrameInput,
) -> Result<GestureEvent, Rejection> {
    if let Some(last) = state.last_transition {
        let elapsed = input.now.saturating_duration_since(last);
        if elapsed <= thresholds.cooldown {
            return Err(Rejection::Cooldown {
                remaining: thresholds.cooldown - elapsed,
            });
        }
    }

    let ClassificationResult {
        label, confidence, ..
    } = input.classification;
    let openness = input.openness;

    match (state.gesture_state, label) {
        (_, GestureLabel::Unknown) => Err(Rejection::UnknownLabel),
        (GestureState::Idle, GestureLabel::Drop) | (GestureState::Holding, GestureLabel::Grab) => {
            Err(Rejection::AlreadyInState)
        }
        (GestureState::Idle, GestureLabel::Grab) => {
            // Accept-side comparisons: a NaN never passes a gate
            if !(confidence > thresholds.grab_conf) {
                Err(Rejection::LowConfidence {
                    confidence,
                    required: thresholds.grab_conf,
                })
            } else if !(openness < thresholds.grab_open_max) {
                Err(Rejection::OpennessMismatch {
                    openness,
                    limit: thresholds.grab_open_max,
                })
            } else {
                Ok(GestureEvent::Grab)
            }
        }
        (GestureState::Holding, GestureLabel::Drop) => {
            if !(confidence > thresholds.drop_conf) {
                Err(Rejection::LowConfidence {
                    confidence,
                    required: thresholds.drop_conf,
                })
            } else if !(openness > thresholds.drop_open_min) {
                Err(Rejection::OpennessMismatch {
                    openness,
                    limit: thresholds.drop_open_min,
                })
            } else {
                Ok(GestureEvent::Drop)
            }
        }
    }
}

/// Apply one frame: returns the next state and the event, if any
pub fn transition(
    state: &MachineState,
    thresholds: &GestureThresholds,
    input: &FrameInput,
) -> (MachineState, Option<GestureEvent>) {
    match decide(state, thresholds, input) {
        Ok(event) => (
            MachineState {
                gesture_state: event.target_state(),
                last_transition: Some(input.now),
            },
            Some(event),
        ),
        Err(_) => (*state, None),
    }
}

/// One session's gesture machine
///
/// Constructed once per session, starts in IDLE and never terminates.
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    state: MachineState,
    thresholds: GestureThresholds,
}

impl GestureStateMachine {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            state: MachineState::default(),
            thresholds,
        }
    }

    /// Evaluate one full-window frame, committing an accepted transition
    pub fn step(&mut self, input: &FrameInput) -> Result<GestureEvent, Rejection> {
        let verdict = decide(&self.state, &self.thresholds, input);
        if let Ok(event) = verdict {
            self.state = MachineState {
                gesture_state: event.target_state(),
                last_transition: Some(input.now),
            };
        }
        verdict
    }

    pub fn gesture_state(&self) -> GestureState {
        self.state.gesture_state
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
