// Gesture Relay Core - hand-landmark gesture recognition
// Per-frame landmark pipeline with non-blocking event relay

// Module declarations
pub mod analysis;
pub mod capture;
pub mod config;
pub mod emitter;
pub mod error;
pub mod managers;
pub mod telemetry;

cfg_if::cfg_if! {
    if #[cfg(feature = "relay_http")] {
        pub mod http;
    }
}

// Re-exports for convenience
pub use analysis::{
    spawn_pipeline_thread, FrameOutcome, GestureEvent, GesturePipeline, GestureState,
    PipelineHandle, PipelineReport,
};
pub use capture::{CaptureSession, Frame, LandmarkSource};
pub use config::AppConfig;
pub use emitter::{EventEmitter, EventSink, RelayMessage};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber once per process
///
/// `RUST_LOG` wins over `default_directive`. `log` records from the library
/// are forwarded through the subscriber's log bridge.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        log::debug!("Logging already initialized");
    }
}
