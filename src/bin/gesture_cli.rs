use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gesture_relay::analysis::{HeuristicModel, PipelineReport};
use gesture_relay::capture::{RecordedSource, SyntheticHandSource, SyntheticSpec};
use gesture_relay::emitter::{ConsoleSink, EventEmitter, EventSink, JsonLinesSink};
use gesture_relay::{AppConfig, CaptureSession, GesturePipeline, LandmarkSource};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "gesture_cli",
    about = "Replay or simulate hand-landmark streams through the gesture pipeline"
)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the relay session id
    #[arg(long, global = true)]
    session: Option<String>,
    /// Output for accepted gestures on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Bare GRAB/DROP labels
    Console,
    /// One relay message per line
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed a recorded landmark file (JSON lines) through the pipeline
    Replay {
        #[arg(long)]
        recording: PathBuf,
    },
    /// Feed a seeded synthetic open/close hand through the pipeline
    Simulate {
        #[arg(long, default_value_t = 3)]
        cycles: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate a configuration file and print the effective settings
    CheckConfig,
    /// Simulate in real time while serving the relay over HTTP
    #[cfg(feature = "relay_http")]
    Serve {
        /// Bind address (defaults to GESTURE_RELAY_HTTP_ADDR or 127.0.0.1:8787)
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
        /// Access token (defaults to GESTURE_RELAY_TOKEN; unset leaves the relay open)
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = 1_000)]
        cycles: u32,
    },
}

fn main() -> ExitCode {
    gesture_relay::init_logging("info");

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(cli.config.as_ref())
        .context("loading configuration")?;
    if let Some(session) = cli.session {
        config.relay.session_id = session;
    }

    match cli.command {
        Commands::Replay { recording } => {
            let source = RecordedSource::open(&recording)
                .with_context(|| format!("opening recording {}", recording.display()))?;
            run_session(&config, cli.format, source)
        }
        Commands::Simulate { cycles, seed } => {
            let source = SyntheticHandSource::new(synthetic_spec(cycles, seed));
            run_session(&config, cli.format, source)
        }
        Commands::CheckConfig => run_check_config(&config),
        #[cfg(feature = "relay_http")]
        Commands::Serve {
            addr,
            token,
            cycles,
        } => serve::run_serve(&config, cli.format, addr, token, cycles),
    }
}

fn synthetic_spec(cycles: u32, seed: Option<u64>) -> SyntheticSpec {
    let mut spec = SyntheticSpec {
        cycles,
        ..SyntheticSpec::default()
    };
    if let Some(seed) = seed {
        spec.seed = seed;
    }
    spec
}

fn output_sink(format: OutputFormat) -> Arc<dyn EventSink> {
    match format {
        OutputFormat::Console => Arc::new(ConsoleSink::stdout()),
        OutputFormat::Json => Arc::new(JsonLinesSink::stdout()),
    }
}

fn build_pipeline(config: &AppConfig, sinks: Vec<Arc<dyn EventSink>>) -> Result<GesturePipeline> {
    let emitter = EventEmitter::spawn(config.relay.session_id.clone(), sinks, &config.relay)
        .context("starting event dispatcher")?;
    GesturePipeline::new(config, HeuristicModel::default(), emitter)
        .context("building gesture pipeline")
}

fn run_session<S: LandmarkSource>(
    config: &AppConfig,
    format: OutputFormat,
    source: S,
) -> Result<ExitCode> {
    let mut pipeline = build_pipeline(config, vec![output_sink(format)])?;
    info!("Running {} through session {}", source.name(), pipeline.session_id());

    let mut session = CaptureSession::new(source);
    let running = AtomicBool::new(true);
    let result = pipeline.run(&mut session, &running);
    let report = pipeline.finish(result.err());

    emit_summary(&report)?;
    Ok(if report.error.is_some() {
        ExitCode::from(2)
    } else {
        ExitCode::from(0)
    })
}

fn run_check_config(config: &AppConfig) -> Result<ExitCode> {
    config.validate().context("validating configuration")?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::from(0))
}

fn emit_summary(report: &PipelineReport) -> Result<()> {
    let payload = SummaryPayload {
        session_id: &report.session_id,
        final_state: report.final_state,
        frames: report.pipeline.frames,
        hands: report.pipeline.hands,
        transitions: report.pipeline.transitions,
        skipped: report.pipeline.skipped,
        emit_failures: report.pipeline.emit_failures,
        delivered: report.dispatch.delivered,
        failed: report.dispatch.failed,
        timed_out: report.dispatch.timed_out,
        error: report.error.as_ref().map(ToString::to_string),
    };
    eprintln!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[derive(Serialize)]
struct SummaryPayload<'a> {
    session_id: &'a str,
    final_state: gesture_relay::GestureState,
    frames: u64,
    hands: u64,
    transitions: u64,
    skipped: u64,
    emit_failures: u64,
    delivered: u64,
    failed: u64,
    timed_out: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(feature = "relay_http")]
mod serve {
    use std::net::SocketAddr;
    use std::thread;
    use std::time::Duration;

    use gesture_relay::capture::FRAME_INTERVAL_MS;
    use gesture_relay::error::CaptureError;
    use gesture_relay::http;
    use gesture_relay::managers::SessionHub;
    use gesture_relay::{spawn_pipeline_thread, Frame};

    use super::*;

    /// Emits frames no faster than the camera would
    struct Paced<S> {
        inner: S,
    }

    impl<S: LandmarkSource> LandmarkSource for Paced<S> {
        fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            thread::sleep(Duration::from_millis(FRAME_INTERVAL_MS));
            self.inner.next_frame()
        }

        fn release(&mut self) {
            self.inner.release();
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    pub fn run_serve(
        config: &AppConfig,
        format: OutputFormat,
        addr: Option<SocketAddr>,
        token: Option<String>,
        cycles: u32,
    ) -> Result<ExitCode> {
        let hub = SessionHub::new();
        let session_id = config.relay.session_id.clone();
        let token = token.or_else(|| std::env::var("GESTURE_RELAY_TOKEN").ok());
        let addr = addr.unwrap_or_else(http::addr_from_env);

        http::spawn_relay_server(hub.clone(), addr, token)
            .context("starting relay HTTP server")?;

        let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(hub.sink(&session_id)), output_sink(format)];
        let pipeline = build_pipeline(config, sinks)?;
        let source = Paced {
            inner: SyntheticHandSource::new(synthetic_spec(cycles, None)),
        };
        let mut handle =
            spawn_pipeline_thread(pipeline, source).context("starting pipeline thread")?;
        info!("Relaying session {} on http://{}/sessions/{}/gestures", session_id, addr, session_id);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building signal runtime")?;
        runtime.block_on(async {
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            let mut ticker = tokio::time::interval(Duration::from_millis(200));
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => {
                        info!("Interrupted, stopping pipeline");
                        break;
                    }
                    _ = ticker.tick() => {
                        if handle.is_finished() {
                            break;
                        }
                    }
                }
            }
        });

        let report = handle
            .stop()
            .context("pipeline thread ended without a report")?;
        emit_summary(&report)?;
        Ok(ExitCode::from(0))
    }
}
