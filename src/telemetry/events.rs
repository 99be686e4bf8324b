//! Core telemetry event types describing pipeline diagnostics exposed to
//! CLI/HTTP surfaces.

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::GestureLabel;
use crate::analysis::state_machine::GestureEvent;

/// High-level lifecycle stages of a gesture session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    SessionStarted,
    WindowReady,
    SourceExhausted,
    SessionStopped,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    CaptureRead,
    Inference,
    SinkDelivery,
    StreamBackpressure,
}

/// Metric events covering inference latency, window fill, and decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    InferenceLatency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    WindowOccupancy {
        session_id: String,
        percent: f32,
    },
    Classification {
        label: GestureLabel,
        confidence: f32,
        openness: f32,
    },
    Transition {
        session_id: String,
        event: GestureEvent,
    },
    FrameSkipped {
        reason: String,
    },
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
