// Outbound relay messages
//
// Wire shapes (one JSON object per message):
//   {"type":"join-room","sessionId":"demo-room"}
//   {"type":"gesture","sessionId":"demo-room","value":"GRAB"}

use serde::{Deserialize, Serialize};

use crate::analysis::state_machine::GestureEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayMessage {
    /// Announces the session before any gesture is relayed
    JoinRoom {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// One accepted gesture transition
    Gesture {
        #[serde(rename = "sessionId")]
        session_id: String,
        value: GestureEvent,
    },
}

impl RelayMessage {
    pub fn join(session_id: impl Into<String>) -> Self {
        RelayMessage::JoinRoom {
            session_id: session_id.into(),
        }
    }

    pub fn gesture(session_id: impl Into<String>, value: GestureEvent) -> Self {
        RelayMessage::Gesture {
            session_id: session_id.into(),
            value,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            RelayMessage::JoinRoom { session_id } | RelayMessage::Gesture { session_id, .. } => {
                session_id
            }
        }
    }

    /// Gesture carried by the message, if any
    pub fn gesture_value(&self) -> Option<GestureEvent> {
        match self {
            RelayMessage::Gesture { value, .. } => Some(*value),
            RelayMessage::JoinRoom { .. } => None,
        }
    }
}
