//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes inference latency, classifications, window
//! occupancy, and session lifecycle events into a bounded history plus an
//! async broadcast stream.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::classifier::ClassificationResult;
use crate::analysis::state_machine::GestureEvent;

pub mod events;

pub use events::{DiagnosticError, LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = lock(&self.history);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Latency tracker maintains a rolling window to compute avg/max latency.
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        let avg = if count == 0 { 0.0 } else { sum / count as f32 };
        (avg, max, count)
    }
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
    window_gauges: Mutex<HashMap<String, f32>>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
            window_gauges: Mutex::new(HashMap::new()),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_classification(&self, result: &ClassificationResult, openness: f32) {
        self.collector.publish(MetricEvent::Classification {
            label: result.label,
            confidence: result.confidence,
            openness,
        });
    }

    pub fn record_inference_latency(&self, elapsed_ms: f32) {
        let (avg, max, count) = lock(&self.latency).observe(elapsed_ms);

        self.collector.publish(MetricEvent::InferenceLatency {
            avg_ms: avg,
            max_ms: max,
            sample_count: count,
        });
    }

    /// Window fill level; small changes are debounced per session
    pub fn record_window_occupancy(&self, session_id: &str, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut gauges = lock(&self.window_gauges);

        let should_emit = gauges
            .get(session_id)
            .map(|last| (last - normalized).abs() >= 2.5)
            .unwrap_or(true);

        if should_emit {
            gauges.insert(session_id.to_string(), normalized);
            self.collector.publish(MetricEvent::WindowOccupancy {
                session_id: session_id.to_string(),
                percent: normalized,
            });
        }
    }

    pub fn record_transition(&self, session_id: &str, event: GestureEvent) {
        self.collector.publish(MetricEvent::Transition {
            session_id: session_id.to_string(),
            event,
        });
    }

    pub fn record_frame_skipped(&self, reason: &str) {
        self.collector.publish(MetricEvent::FrameSkipped {
            reason: reason.to_string(),
        });
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.collector.publish(MetricEvent::Lifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::GestureLabel;

    fn sample_result(confidence: f32) -> ClassificationResult {
        ClassificationResult {
            label: GestureLabel::Grab,
            label_index: 0,
            confidence,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::InferenceLatency {
            avg_ms: 1.0,
            max_ms: 2.0,
            sample_count: 1,
        });
        collector.publish(MetricEvent::InferenceLatency {
            avg_ms: 3.0,
            max_ms: 4.0,
            sample_count: 2,
        });
        collector.publish(MetricEvent::WindowOccupancy {
            session_id: "test".to_string(),
            percent: 50.0,
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(
            matches!(snapshot.recent[0], MetricEvent::InferenceLatency { avg_ms, .. } if (avg_ms - 1.0).abs() < f32::EPSILON)
        );
        assert!(matches!(
            snapshot.recent[2],
            MetricEvent::WindowOccupancy { .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for i in 0..3 {
            collector.publish(MetricEvent::FrameSkipped {
                reason: format!("r{}", i),
            });
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(
            snapshot.recent[0],
            MetricEvent::FrameSkipped {
                reason: "r1".to_string()
            }
        );
    }

    #[test]
    fn hub_tracks_rolling_latency() {
        let hub = TelemetryHub::new(8, 8, 2);
        hub.record_inference_latency(10.0);
        hub.record_inference_latency(20.0);
        hub.record_inference_latency(40.0);

        let snapshot = hub.snapshot();
        let last = snapshot.recent.last().cloned();
        assert_eq!(
            last,
            Some(MetricEvent::InferenceLatency {
                avg_ms: 30.0,
                max_ms: 40.0,
                sample_count: 2,
            })
        );
    }

    #[test]
    fn hub_records_classification_and_transition() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_classification(&sample_result(0.9), 0.2);
        hub.record_transition("room", GestureEvent::Grab);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.total_events, 2);
        assert!(snapshot.recent.iter().any(|event| matches!(
            event,
            MetricEvent::Classification { label: GestureLabel::Grab, .. }
        )));
        assert!(snapshot.recent.iter().any(|event| matches!(
            event,
            MetricEvent::Transition { event: GestureEvent::Grab, .. }
        )));
    }

    #[test]
    fn window_gauge_debounces_small_changes() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_window_occupancy("a", 10.0);
        hub.record_window_occupancy("a", 10.5);
        hub.record_window_occupancy("a", 25.0);
        hub.record_window_occupancy("b", 25.0);

        let count = hub
            .snapshot()
            .recent
            .iter()
            .filter(|event| matches!(event, MetricEvent::WindowOccupancy { .. }))
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn metric_event_wire_format() {
        let json = serde_json::to_value(MetricEvent::Transition {
            session_id: "demo-room".to_string(),
            event: GestureEvent::Drop,
        })
        .unwrap();
        assert_eq!(json["type"], "transition");
        assert_eq!(json["payload"]["event"], "DROP");
    }
}
