// SessionHub: per-session tokio broadcast channels for relayed gestures
// Single Responsibility: relay channel lifecycle and subscription

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::emitter::{BroadcastSink, RelayMessage};

/// Buffer per session channel; slow subscribers lag past this many messages
const SESSION_CHANNEL_CAPACITY: usize = 100;

/// Manages one broadcast channel per session id
///
/// Channels are created lazily by either side: the pipeline's
/// [`BroadcastSink`] or a subscriber that connects first. Sessions never
/// share a channel.
#[derive(Clone, Default)]
pub struct SessionHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<RelayMessage>>>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<RelayMessage>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sender for `session_id`, creating the channel on first use
    pub fn sender(&self, session_id: &str) -> broadcast::Sender<RelayMessage> {
        self.channels()
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SESSION_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Sink publishing into `session_id`'s channel
    pub fn sink(&self, session_id: &str) -> BroadcastSink {
        BroadcastSink::new(self.sender(session_id))
    }

    /// Subscribe to messages relayed for `session_id`
    ///
    /// Each subscriber receives independent copies of all messages sent
    /// after it subscribed.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<RelayMessage> {
        self.sender(session_id).subscribe()
    }

    /// Known session ids, sorted
    pub fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.channels()
            .get(session_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a session's channel; existing receivers see it close once
    /// every sender is gone.
    pub fn remove(&self, session_id: &str) -> bool {
        self.channels().remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::state_machine::GestureEvent;
    use crate::emitter::EventSink;

    #[test]
    fn test_session_channel_lifecycle() {
        let hub = SessionHub::new();
        assert!(hub.sessions().is_empty());

        let mut rx = hub.subscribe("room-a");
        assert_eq!(hub.sessions(), vec!["room-a".to_string()]);
        assert_eq!(hub.subscriber_count("room-a"), 1);

        hub.sink("room-a")
            .send(&RelayMessage::gesture("room-a", GestureEvent::Grab))
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            RelayMessage::gesture("room-a", GestureEvent::Grab)
        );

        assert!(hub.remove("room-a"));
        assert!(!hub.remove("room-a"));
        assert_eq!(hub.subscriber_count("room-a"), 0);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let hub = SessionHub::new();
        let mut a = hub.subscribe("a");
        let mut b = hub.subscribe("b");

        hub.sender("a")
            .send(RelayMessage::gesture("a", GestureEvent::Drop))
            .unwrap();

        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
        assert_eq!(hub.sessions(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_multiple_subscribers_receive_copies() {
        let hub = SessionHub::new();
        let mut first = hub.subscribe("room");
        let mut second = hub.clone().subscribe("room");

        hub.sender("room").send(RelayMessage::join("room")).unwrap();

        assert_eq!(first.try_recv().unwrap(), RelayMessage::join("room"));
        assert_eq!(second.try_recv().unwrap(), RelayMessage::join("room"));
    }
}
