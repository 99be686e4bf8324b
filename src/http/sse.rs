use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::emitter::RelayMessage;
use crate::managers::SessionHub;

pub type GestureStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Build a Server-Sent Events stream of one session's relay messages.
///
/// Each event is named after the message type (`join-room`, `gesture`) and
/// carries the JSON wire form. Lagged subscribers silently skip ahead.
pub fn session_gestures(hub: &SessionHub, session_id: &str) -> GestureStream {
    let receiver = hub.subscribe(session_id);

    let stream = BroadcastStream::new(receiver).filter_map(|result| async move {
        let message = result.ok()?;
        let payload = serde_json::to_string(&message).ok()?;
        Some(Ok(Event::default()
            .event(event_name(&message))
            .data(payload)))
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("relay-keepalive"),
    )
}

fn event_name(message: &RelayMessage) -> &'static str {
    match message {
        RelayMessage::JoinRoom { .. } => "join-room",
        RelayMessage::Gesture { .. } => "gesture",
    }
}
