// Analysis module - per-frame gesture decision pipeline
//
// This module orchestrates the complete gesture pipeline for one session,
// consuming landmark frames and emitting debounced GRAB/DROP events.
//
// Architecture:
// - GesturePipeline: owns the window, classifier, state machine and emitter
// - Per frame: normalize -> window push; openness on raw landmarks
//   -> (window full) classify -> state machine -> emitter
// - PipelineHandle: runs the loop on its own thread until the source is
//   exhausted or the handle is stopped
//
// All per-session state is mutated from a single thread of control, so no
// locking is needed inside the pipeline. Frame-scoped failures (no hand,
// classifier errors, timestamp regressions) skip the frame; only a failing
// landmark source stops the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureSession, Frame, LandmarkSource};
use crate::config::AppConfig;
use crate::emitter::{DispatchStats, EventEmitter};
use crate::error::{
    log_capture_error, log_classifier_error, log_sink_error, CaptureError, ClassifierError,
    ConfigError, SinkError,
};
use crate::telemetry::{self, DiagnosticError, LifecyclePhase};

pub mod classifier;
pub mod features;
pub mod inference;
pub mod landmarks;
pub mod models;
pub mod openness;
pub mod state_machine;
pub mod window;

pub use classifier::{ClassificationAdapter, ClassificationResult, GestureLabel, GestureModel, LabelSet};
pub use features::{normalize, FeatureVector};
pub use inference::TimeoutModel;
pub use landmarks::{HandLandmarks, Landmark};
pub use models::{HeuristicModel, ScriptedModel};
pub use openness::openness;
pub use state_machine::{
    GestureEvent, GestureState, GestureStateMachine, GestureThresholds, Rejection,
};
pub use window::SlidingWindow;

/// Why a frame was dropped before reaching the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSkip {
    Capture(CaptureError),
    Classifier(ClassifierError),
}

impl FrameSkip {
    pub fn reason(&self) -> &'static str {
        match self {
            FrameSkip::Capture(CaptureError::TimestampRegression { .. }) => "timestamp_regression",
            FrameSkip::Capture(CaptureError::InvalidLandmarkCount { .. })
            | FrameSkip::Capture(CaptureError::NonFiniteLandmark { .. }) => "invalid_landmarks",
            FrameSkip::Capture(_) => "capture",
            FrameSkip::Classifier(ClassifierError::Timeout { .. }) => "inference_timeout",
            FrameSkip::Classifier(ClassifierError::Busy) => "inference_busy",
            FrameSkip::Classifier(_) => "classifier",
        }
    }
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No hand detected; window and state untouched
    NoHand,
    /// Hand appended, window not yet full
    WindowFilling { len: usize, capacity: usize },
    /// Frame dropped without a decision
    Skipped(FrameSkip),
    /// Classified, but the state machine declined to transition
    NoTransition(Rejection),
    /// Accepted transition, handed to the emitter
    Transition(GestureEvent),
}

/// Running counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub hands: u64,
    pub classified: u64,
    pub transitions: u64,
    pub skipped: u64,
    pub emit_failures: u64,
}

/// Final account of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub session_id: String,
    pub final_state: GestureState,
    pub pipeline: PipelineStats,
    pub dispatch: DispatchStats,
    /// Source failure that ended the session early, if any
    pub error: Option<CaptureError>,
}

/// One session's gesture pipeline
pub struct GesturePipeline {
    session_id: String,
    window: SlidingWindow,
    adapter: ClassificationAdapter,
    machine: GestureStateMachine,
    emitter: EventEmitter,
    origin: Instant,
    last_timestamp_ms: Option<u64>,
    window_ready_reported: bool,
    stats: PipelineStats,
}

impl GesturePipeline {
    /// Build a pipeline from validated configuration
    ///
    /// The model runs behind a [`TimeoutModel`] unless
    /// `inference.timeout_ms` is 0.
    pub fn new<M: GestureModel + 'static>(
        config: &AppConfig,
        model: M,
        emitter: EventEmitter,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let labels = LabelSet::new(&config.gesture.labels)?;

        let model: Box<dyn GestureModel> = if config.inference.timeout_ms == 0 {
            Box::new(model)
        } else {
            Box::new(TimeoutModel::spawn(model, config.inference.timeout()))
        };

        log::info!(
            "[Pipeline] Session {} ready (window {}, labels {:?})",
            emitter.session_id(),
            config.gesture.window_size,
            config.gesture.labels
        );

        Ok(Self {
            session_id: emitter.session_id().to_string(),
            window: SlidingWindow::new(config.gesture.window_size),
            adapter: ClassificationAdapter::new(model, labels),
            machine: GestureStateMachine::new(GestureThresholds::from(&config.gesture)),
            emitter,
            origin: Instant::now(),
            last_timestamp_ms: None,
            window_ready_reported: false,
            stats: PipelineStats::default(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn gesture_state(&self) -> GestureState {
        self.machine.gesture_state()
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Feed one frame through the pipeline
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        self.stats.frames += 1;

        if let Some(previous_ms) = self.last_timestamp_ms {
            if frame.timestamp_ms < previous_ms {
                return self.skip(FrameSkip::Capture(CaptureError::TimestampRegression {
                    previous_ms,
                    current_ms: frame.timestamp_ms,
                }));
            }
        }
        self.last_timestamp_ms = Some(frame.timestamp_ms);

        let Some(hand) = frame.hand.as_ref() else {
            log::trace!("[Pipeline] No hand at {}ms", frame.timestamp_ms);
            return FrameOutcome::NoHand;
        };
        self.stats.hands += 1;

        // A corrupt keypoint would stay in the window for its whole span
        if let Err(err) = hand.check_finite() {
            return self.skip(FrameSkip::Capture(err));
        }

        self.window.push(normalize(hand));
        let openness = openness(hand);
        telemetry::hub().record_window_occupancy(&self.session_id, self.window.occupancy_percent());

        if !self.window.is_ready() {
            return FrameOutcome::WindowFilling {
                len: self.window.len(),
                capacity: self.window.capacity(),
            };
        }
        if !self.window_ready_reported {
            self.window_ready_reported = true;
            telemetry::hub().record_lifecycle(LifecyclePhase::WindowReady);
        }

        let started = Instant::now();
        let classified = self.adapter.classify(&self.window.snapshot());
        telemetry::hub().record_inference_latency(started.elapsed().as_secs_f32() * 1000.0);

        let classification = match classified {
            Ok(result) => result,
            Err(err) => {
                log_classifier_error(&err, "GesturePipeline::process_frame");
                telemetry::hub().record_error(DiagnosticError::Inference, err.to_string());
                return self.skip(FrameSkip::Classifier(err));
            }
        };
        self.stats.classified += 1;
        telemetry::hub().record_classification(&classification, openness);

        let input = state_machine::FrameInput {
            classification,
            openness,
            now: self.origin + Duration::from_millis(frame.timestamp_ms),
        };

        match self.machine.step(&input) {
            Ok(event) => {
                self.stats.transitions += 1;
                log::info!(
                    "[Pipeline] {} at {}ms (confidence {:.2}, openness {:.3}) -> {:?}",
                    event,
                    frame.timestamp_ms,
                    classification.confidence,
                    openness,
                    event.target_state()
                );
                telemetry::hub().record_transition(&self.session_id, event);
                if let Err(err) = self.emitter.emit(event) {
                    self.stats.emit_failures += 1;
                    log_sink_error(&err, "GesturePipeline::emit");
                    let code = match err {
                        SinkError::Backpressure { .. } => DiagnosticError::StreamBackpressure,
                        _ => DiagnosticError::SinkDelivery,
                    };
                    telemetry::hub().record_error(code, err.to_string());
                }
                FrameOutcome::Transition(event)
            }
            Err(rejection) => {
                log::debug!(
                    "[Pipeline] {:?} {:.2} rejected at {}ms: {}",
                    classification.label,
                    classification.confidence,
                    frame.timestamp_ms,
                    rejection.reason()
                );
                FrameOutcome::NoTransition(rejection)
            }
        }
    }

    fn skip(&mut self, skip: FrameSkip) -> FrameOutcome {
        self.stats.skipped += 1;
        log::debug!("[Pipeline] Frame skipped: {}", skip.reason());
        telemetry::hub().record_frame_skipped(skip.reason());
        FrameOutcome::Skipped(skip)
    }

    /// Pull frames until the source is exhausted or `running` is cleared
    ///
    /// The source is released before returning on every path. Frame-scoped
    /// capture errors skip the frame; any other capture error ends the run.
    pub fn run<S: LandmarkSource>(
        &mut self,
        session: &mut CaptureSession<S>,
        running: &AtomicBool,
    ) -> Result<(), CaptureError> {
        telemetry::hub().record_lifecycle(LifecyclePhase::SessionStarted);
        log::info!("[Pipeline] Starting frame loop for session {}", self.session_id);

        let result = loop {
            if !running.load(Ordering::SeqCst) {
                log::info!("[Pipeline] Stop requested, leaving frame loop");
                break Ok(());
            }

            match session.next_frame() {
                Ok(Some(frame)) => {
                    self.process_frame(&frame);
                }
                Ok(None) => {
                    telemetry::hub().record_lifecycle(LifecyclePhase::SourceExhausted);
                    log::info!("[Pipeline] Source exhausted");
                    break Ok(());
                }
                Err(err) if err.is_frame_scoped() => {
                    self.stats.frames += 1;
                    self.skip(FrameSkip::Capture(err));
                }
                Err(err) => {
                    log_capture_error(&err, "GesturePipeline::run");
                    telemetry::hub().record_error(DiagnosticError::CaptureRead, err.to_string());
                    break Err(err);
                }
            }
        };

        session.release();
        telemetry::hub().record_lifecycle(LifecyclePhase::SessionStopped);
        log::info!(
            "[Pipeline] Session {} stopped: {:?}",
            self.session_id,
            self.stats
        );
        result
    }

    /// Flush the emitter and summarize the session
    pub fn finish(self, error: Option<CaptureError>) -> PipelineReport {
        let final_state = self.machine.gesture_state();
        let pipeline = self.stats;
        let session_id = self.session_id;
        let dispatch = self.emitter.shutdown();
        PipelineReport {
            session_id,
            final_state,
            pipeline,
            dispatch,
            error,
        }
    }
}

/// Handle to a pipeline running on its own thread
///
/// Dropping the handle stops the pipeline and waits for it.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<PipelineReport>>,
}

impl PipelineHandle {
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| worker.is_finished())
            .unwrap_or(true)
    }

    /// Ask the loop to stop after the current frame, then wait for it
    pub fn stop(&mut self) -> Option<PipelineReport> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the source to run out without requesting a stop
    pub fn wait(mut self) -> Option<PipelineReport> {
        self.join()
    }

    fn join(&mut self) -> Option<PipelineReport> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(report) => Some(report),
            Err(_) => {
                log::error!("[Pipeline] Pipeline thread panicked");
                None
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `pipeline` over `source` on a dedicated thread
pub fn spawn_pipeline_thread<S: LandmarkSource + 'static>(
    mut pipeline: GesturePipeline,
    source: S,
) -> Result<PipelineHandle, CaptureError> {
    let running = Arc::new(AtomicBool::new(true));
    let thread_running = Arc::clone(&running);

    let worker = thread::Builder::new()
        .name(format!("pipeline-{}", pipeline.session_id()))
        .spawn(move || {
            let mut session = CaptureSession::new(source);
            let result = pipeline.run(&mut session, &thread_running);
            drop(session);
            pipeline.finish(result.err())
        })
        .map_err(|err| CaptureError::InitFailed {
            reason: format!("failed to spawn pipeline thread: {}", err),
        })?;

    Ok(PipelineHandle {
        running,
        worker: Some(worker),
    })
}
