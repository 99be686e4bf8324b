// Event sinks - destinations for relay messages
//
// Every sink is best-effort: a failed send is reported to the dispatcher,
// which logs it and moves on. Sinks are shared with blocking worker tasks,
// so they must be Send + Sync and use interior mutability for any state.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::message::RelayMessage;
use crate::analysis::state_machine::GestureEvent;
use crate::error::SinkError;

/// Destination for relay messages
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message. May block; the dispatcher bounds it with a timeout.
    fn send(&self, message: &RelayMessage) -> Result<(), SinkError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Prints the bare label (`GRAB` / `DROP`) of each gesture
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, message: &RelayMessage) -> Result<(), SinkError> {
        if let Some(value) = message.gesture_value() {
            let mut out = lock(&self.out);
            writeln!(out, "{}", value)?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Writes every message as one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn send(&self, message: &RelayMessage) -> Result<(), SinkError> {
        let line = serde_json::to_string(message)?;
        let mut out = lock(&self.out);
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Publishes into a session's broadcast channel
///
/// Having no subscribers is not a failure: the message is simply not seen
/// by anyone, matching at-most-once relay semantics.
pub struct BroadcastSink {
    tx: broadcast::Sender<RelayMessage>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<RelayMessage>) -> Self {
        Self { tx }
    }
}

impl EventSink for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn send(&self, message: &RelayMessage) -> Result<(), SinkError> {
        match self.tx.send(message.clone()) {
            Ok(receivers) => {
                log::debug!("[Emitter] Relayed to {} subscriber(s)", receivers);
            }
            Err(_) => {
                log::debug!(
                    "[Emitter] No subscribers for session {}",
                    message.session_id()
                );
            }
        }
        Ok(())
    }
}

/// Collects messages in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<RelayMessage>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RelayMessage> {
        lock(&self.messages).clone()
    }

    pub fn gestures(&self) -> Vec<GestureEvent> {
        lock(&self.messages)
            .iter()
            .filter_map(RelayMessage::gesture_value)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, message: &RelayMessage) -> Result<(), SinkError> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_prints_bare_label() {
        let sink = ConsoleSink::new(Vec::new());
        sink.send(&RelayMessage::join("room")).unwrap();
        sink.send(&RelayMessage::gesture("room", GestureEvent::Grab))
            .unwrap();
        sink.send(&RelayMessage::gesture("room", GestureEvent::Drop))
            .unwrap();

        let printed = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(printed, "GRAB\nDROP\n");
    }

    #[test]
    fn test_json_lines_sink_writes_one_object_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.send(&RelayMessage::join("room")).unwrap();
        sink.send(&RelayMessage::gesture("room", GestureEvent::Drop))
            .unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"join-room","sessionId":"room"}"#);
        assert!(lines[1].contains(r#""value":"DROP""#));
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_is_ok() {
        let (tx, _) = broadcast::channel(4);
        let sink = BroadcastSink::new(tx);
        assert!(sink
            .send(&RelayMessage::gesture("room", GestureEvent::Grab))
            .is_ok());
    }

    #[test]
    fn test_broadcast_sink_reaches_subscriber() {
        let (tx, mut rx) = broadcast::channel(4);
        let sink = BroadcastSink::new(tx);
        sink.send(&RelayMessage::gesture("room", GestureEvent::Grab))
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            RelayMessage::gesture("room", GestureEvent::Grab)
        );
    }

    #[test]
    fn test_recording_sink_shares_state_between_clones() {
        let sink = RecordingSink::new();
        let observer = sink.clone();
        sink.send(&RelayMessage::join("room")).unwrap();
        sink.send(&RelayMessage::gesture("room", GestureEvent::Grab))
            .unwrap();
        assert_eq!(observer.messages().len(), 2);
        assert_eq!(observer.gestures(), vec![GestureEvent::Grab]);
    }
}
