// Managers Module
//
// Focused manager types, each handling one shared-state concern:
// - SessionHub: per-session broadcast channels for relayed gestures

pub mod session_hub;

pub use session_hub::SessionHub;
