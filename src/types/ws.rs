use super::{FeedStatus, GameAction, GameSnapshot};
use serde::Serialize;

/// Incoming WebSocket message from a renderer client.
pub type ClientMessage = GameAction;

/// Outgoing WebSocket message to a renderer client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Per-frame game state.
    State { data: Box<GameSnapshot> },
    /// Connector status change.
    Feed { data: FeedStatus },
    /// Result of a client action.
    Ack { accepted: bool },
    Error { error: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","error":"serialization failed"}"#.to_string())
    }
}
