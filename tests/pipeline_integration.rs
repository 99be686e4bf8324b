//! Integration tests for the gesture pipeline
//!
//! These tests drive complete sessions through the public API:
//! - Synthetic open/close motion with the heuristic classifier
//! - The closing-hand GRAB scenario with a scripted classifier
//! - Replay of a recorded JSON-lines landmark file
//! - Relay of accepted gestures through the session hub

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use gesture_relay::analysis::landmarks::{FINGERTIPS, LANDMARK_COUNT, MIDDLE_MCP};
use gesture_relay::analysis::{HandLandmarks, HeuristicModel, Landmark, ScriptedModel};
use gesture_relay::capture::{
    RecordedSource, ScriptedSource, SyntheticHandSource, SyntheticSpec, FRAME_INTERVAL_MS,
};
use gesture_relay::emitter::{JsonLinesSink, RecordingSink};
use gesture_relay::error::CaptureError;
use gesture_relay::managers::SessionHub;
use gesture_relay::{
    spawn_pipeline_thread, AppConfig, EventEmitter, EventSink, Frame, GestureEvent,
    GesturePipeline, GestureState, LandmarkSource, PipelineReport, RelayMessage,
};

fn pipeline_with_sinks<M>(
    config: &AppConfig,
    model: M,
    sinks: Vec<Arc<dyn EventSink>>,
) -> GesturePipeline
where
    M: gesture_relay::analysis::GestureModel + 'static,
{
    let emitter = EventEmitter::spawn(config.relay.session_id.clone(), sinks, &config.relay)
        .expect("dispatcher starts");
    GesturePipeline::new(config, model, emitter).expect("valid config")
}

fn run_to_end<S: LandmarkSource + 'static>(
    pipeline: GesturePipeline,
    source: S,
) -> PipelineReport {
    spawn_pipeline_thread(pipeline, source)
        .expect("pipeline thread")
        .wait()
        .expect("pipeline report")
}

/// Hand whose raw openness equals `reach`
fn hand(reach: f32) -> HandLandmarks {
    let mut points = [Landmark::new(0.4, 0.9, 0.0); LANDMARK_COUNT];
    points[MIDDLE_MCP] = Landmark::new(0.4, 0.8, 0.0);
    for &tip in FINGERTIPS.iter() {
        points[tip] = Landmark::new(0.4, 0.9 - reach, 0.0);
    }
    HandLandmarks::new(points)
}

fn temp_recording(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "gesture_relay_{}_{}.jsonl",
        name,
        std::process::id()
    ))
}

#[test]
fn test_quiet_synthetic_session_alternates_grab_and_drop() {
    let config = AppConfig::default();
    let recording = RecordingSink::new();
    let pipeline = pipeline_with_sinks(
        &config,
        HeuristicModel::default(),
        vec![Arc::new(recording.clone())],
    );
    let spec = SyntheticSpec {
        cycles: 2,
        dropout_rate: 0.0,
        jitter: 0.0,
        ..SyntheticSpec::default()
    };
    let total = spec.total_frames() as u64;

    let report = run_to_end(pipeline, SyntheticHandSource::new(spec));

    assert_eq!(report.error, None);
    assert_eq!(report.pipeline.frames, total);
    assert_eq!(report.pipeline.hands, total);
    assert_eq!(
        recording.gestures(),
        vec![
            GestureEvent::Grab,
            GestureEvent::Drop,
            GestureEvent::Grab,
            GestureEvent::Drop
        ]
    );
    assert_eq!(report.final_state, GestureState::Idle);
    assert_eq!(report.dispatch.delivered, 5);
}

#[test]
fn test_noisy_synthetic_session_still_alternates() {
    let config = AppConfig::default();
    let recording = RecordingSink::new();
    let pipeline = pipeline_with_sinks(
        &config,
        HeuristicModel::default(),
        vec![Arc::new(recording.clone())],
    );

    let report = run_to_end(pipeline, SyntheticHandSource::new(SyntheticSpec::default()));

    let gestures = recording.gestures();
    assert_eq!(gestures.len(), 6, "gestures: {:?}", gestures);
    for (i, gesture) in gestures.iter().enumerate() {
        let expected = if i % 2 == 0 {
            GestureEvent::Grab
        } else {
            GestureEvent::Drop
        };
        assert_eq!(*gesture, expected, "gesture {} out of order", i);
    }
    assert!(report.pipeline.hands <= report.pipeline.frames);
}

#[test]
fn test_closing_hand_window_emits_single_grab() {
    let mut config = AppConfig::default();
    config.relay.session_id = "scenario".to_string();
    let recording = RecordingSink::new();
    let pipeline = pipeline_with_sinks(
        &config,
        ScriptedModel::constant(vec![0.8, 0.2]),
        vec![Arc::new(recording.clone())],
    );

    // 30 frames closing from a relaxed hand down to openness 0.2
    let frames = (0..30u64)
        .map(|i| {
            let reach = 0.34 - (0.14 * i as f32 / 29.0);
            Frame::with_hand(i * FRAME_INTERVAL_MS, hand(reach))
        })
        .collect();

    let report = run_to_end(pipeline, ScriptedSource::new(frames));

    assert_eq!(report.final_state, GestureState::Holding);
    assert_eq!(report.pipeline.transitions, 1);
    assert_eq!(
        recording.messages(),
        vec![
            RelayMessage::join("scenario"),
            RelayMessage::gesture("scenario", GestureEvent::Grab),
        ]
    );
}

#[test]
fn test_recorded_replay_matches_live_session() {
    let spec = SyntheticSpec {
        cycles: 1,
        dropout_rate: 0.0,
        jitter: 0.0,
        ..SyntheticSpec::default()
    };
    let mut source = SyntheticHandSource::new(spec);
    let mut lines = vec![serde_json::to_string(&Frame::empty(0)).expect("frame json")];
    while let Some(frame) = source.next_frame().expect("synthetic frame") {
        let shifted = Frame {
            timestamp_ms: frame.timestamp_ms + FRAME_INTERVAL_MS,
            ..frame
        };
        lines.push(serde_json::to_string(&shifted).expect("frame json"));
    }
    lines.insert(1, String::new());

    let path = temp_recording("replay");
    fs::write(&path, lines.join("\n")).expect("write recording");

    let config = AppConfig::default();
    let output = Arc::new(JsonLinesSink::new(Vec::new()));
    let recording = RecordingSink::new();
    let pipeline = pipeline_with_sinks(
        &config,
        HeuristicModel::default(),
        vec![Arc::new(recording.clone()), output.clone()],
    );
    let replay = RecordedSource::open(&path).expect("open recording");
    let report = run_to_end(pipeline, replay);
    fs::remove_file(&path).ok();

    assert_eq!(report.error, None);
    assert_eq!(report.pipeline.frames, lines.len() as u64 - 1);
    assert_eq!(report.pipeline.hands, report.pipeline.frames - 1);
    assert_eq!(
        recording.gestures(),
        vec![GestureEvent::Grab, GestureEvent::Drop]
    );

    let written = match Arc::try_unwrap(output) {
        Ok(sink) => String::from_utf8(sink.into_inner()).expect("utf8 output"),
        Err(_) => panic!("json sink still shared"),
    };
    let wire: Vec<&str> = written.lines().collect();
    assert_eq!(wire[0], r#"{"type":"join-room","sessionId":"demo-room"}"#);
    assert_eq!(
        wire[1],
        r#"{"type":"gesture","sessionId":"demo-room","value":"GRAB"}"#
    );
    assert_eq!(wire.len(), 3);
}

#[test]
fn test_malformed_recording_stops_session() {
    let body = format!(
        "{}\n{{\"timestamp_ms\": 33, \"landmarks\": [[0.1, 0.2]]}}\n{}\n",
        serde_json::to_string(&Frame::with_hand(0, hand(0.2))).expect("frame json"),
        serde_json::to_string(&Frame::with_hand(66, hand(0.2))).expect("frame json"),
    );
    let replay = RecordedSource::from_reader(Cursor::new(body.into_bytes()), "inline");

    let config = AppConfig::default();
    let pipeline = pipeline_with_sinks(&config, HeuristicModel::default(), Vec::new());
    let report = run_to_end(pipeline, replay);

    assert!(
        matches!(report.error, Some(CaptureError::ReadFailed { .. })),
        "error: {:?}",
        report.error
    );
    assert_eq!(report.pipeline.frames, 1);
}

#[test]
fn test_missing_recording_fails_before_any_frame() {
    let result = RecordedSource::open(temp_recording("does_not_exist"));
    assert!(matches!(result, Err(CaptureError::InitFailed { .. })));
}

#[test]
fn test_session_hub_relays_accepted_gestures() {
    let hub = SessionHub::new();
    let mut viewer = hub.subscribe("hub-room");

    let mut config = AppConfig::default();
    config.relay.session_id = "hub-room".to_string();
    let pipeline = pipeline_with_sinks(
        &config,
        HeuristicModel::default(),
        vec![Arc::new(hub.sink("hub-room"))],
    );
    let spec = SyntheticSpec {
        cycles: 1,
        dropout_rate: 0.0,
        jitter: 0.0,
        ..SyntheticSpec::default()
    };
    run_to_end(pipeline, SyntheticHandSource::new(spec));

    let mut received = Vec::new();
    while let Ok(message) = viewer.try_recv() {
        received.push(message);
    }
    assert_eq!(
        received,
        vec![
            RelayMessage::join("hub-room"),
            RelayMessage::gesture("hub-room", GestureEvent::Grab),
            RelayMessage::gesture("hub-room", GestureEvent::Drop),
        ]
    );
}
