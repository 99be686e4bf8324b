// Event emitter - hands accepted gesture transitions to the outside world
//
// The per-frame loop must never wait on a sink. `emit()` only enqueues the
// message (non-blocking); a dedicated dispatcher thread with its own Tokio
// runtime drains the queue and delivers each message to every sink, bounding
// each delivery with `send_timeout`. Failures and timeouts are logged and
// counted, never propagated back into the pipeline.
//
// Message order per session: one join-room announcement, then gestures in
// the order they were accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Builder;
use tokio::sync::mpsc;

use crate::analysis::state_machine::GestureEvent;
use crate::config::RelayConfig;
use crate::error::{log_sink_error, SinkError};

pub mod message;
pub mod sinks;

pub use message::RelayMessage;
pub use sinks::{BroadcastSink, ConsoleSink, EventSink, JsonLinesSink, RecordingSink};

/// Grace period for in-flight blocking sends when the dispatcher stops
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Delivery counters, one increment per (message, sink) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
}

#[derive(Default)]
struct DispatchCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl DispatchCounters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Session-scoped, non-blocking event emitter
pub struct EventEmitter {
    session_id: String,
    tx: Option<mpsc::Sender<RelayMessage>>,
    capacity: usize,
    counters: Arc<DispatchCounters>,
    worker: Option<JoinHandle<()>>,
}

impl EventEmitter {
    /// Start the dispatcher and queue the session announcement
    pub fn spawn(
        session_id: impl Into<String>,
        sinks: Vec<Arc<dyn EventSink>>,
        config: &RelayConfig,
    ) -> Result<Self, SinkError> {
        let session_id = session_id.into();
        let capacity = config.queue_capacity.max(1);
        let send_timeout = config.send_timeout();
        let (tx, rx) = mpsc::channel::<RelayMessage>(capacity);
        let counters = Arc::new(DispatchCounters::default());

        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(SinkError::from)?;

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name(format!("emitter-{}", session_id))
            .spawn(move || {
                runtime.block_on(dispatch_loop(rx, sinks, send_timeout, worker_counters));
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            })
            .map_err(SinkError::from)?;

        log::info!(
            "[Emitter] Dispatcher started for session {} (queue {}, timeout {}ms)",
            session_id,
            capacity,
            send_timeout.as_millis()
        );

        let emitter = Self {
            session_id,
            tx: Some(tx),
            capacity,
            counters,
            worker: Some(worker),
        };
        emitter.enqueue(RelayMessage::join(emitter.session_id.clone()))?;
        Ok(emitter)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue a gesture for delivery without waiting on any sink
    pub fn emit(&self, event: GestureEvent) -> Result<(), SinkError> {
        self.enqueue(RelayMessage::gesture(self.session_id.clone(), event))
    }

    fn enqueue(&self, message: RelayMessage) -> Result<(), SinkError> {
        let tx = self.tx.as_ref().ok_or_else(|| SinkError::Closed {
            sink: "dispatcher".to_string(),
        })?;

        tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SinkError::Backpressure {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed {
                sink: "dispatcher".to_string(),
            },
        })
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    /// Deliver everything already queued, then stop the dispatcher
    pub fn shutdown(mut self) -> DispatchStats {
        self.close();
        self.counters.snapshot()
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[Emitter] Dispatcher thread panicked");
            }
            log::info!("[Emitter] Dispatcher for session {} stopped", self.session_id);
        }
    }
}

impl Drop for EventEmitter {
    fn drop(&mut self) {
        self.close();
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<RelayMessage>,
    sinks: Vec<Arc<dyn EventSink>>,
    send_timeout: Duration,
    counters: Arc<DispatchCounters>,
) {
    while let Some(message) = rx.recv().await {
        for sink in &sinks {
            deliver(Arc::clone(sink), &message, send_timeout, &counters).await;
        }
    }
}

async fn deliver(
    sink: Arc<dyn EventSink>,
    message: &RelayMessage,
    send_timeout: Duration,
    counters: &DispatchCounters,
) {
    let name = sink.name().to_string();
    let outgoing = message.clone();
    let task = tokio::task::spawn_blocking(move || sink.send(&outgoing));

    match tokio::time::timeout(send_timeout, task).await {
        Ok(Ok(Ok(()))) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Ok(Err(err))) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log_sink_error(&err, &name);
        }
        Ok(Err(join_err)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log::error!("[Emitter] Sink {} panicked: {}", name, join_err);
        }
        Err(_) => {
            counters.timed_out.fetch_add(1, Ordering::Relaxed);
            log_sink_error(
                &SinkError::Timeout {
                    sink: name,
                    timeout_ms: send_timeout.as_millis() as u64,
                },
                "dispatch",
            );
        }
    }
}
