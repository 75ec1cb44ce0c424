use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use space_surfer::types::{ClientMessage, ServerMessage};
use space_surfer::GameEngine;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = Uuid::new_v4();
    info!("WebSocket client connected: {}", client_id);

    // Create a channel for sending messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Spawn a task to forward messages from the channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Current state first, so the client can render before the next frame
    let initial = ServerMessage::State {
        data: Box::new(state.engine.snapshot()),
    };
    let _ = tx.send(initial.to_json());

    // Forward engine updates to this client
    let mut updates = state.engine.subscribe();
    let broadcast_tx = tx.clone();
    let broadcast_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(msg) => {
                    if broadcast_tx.send(msg.to_json()).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Client {} lagged, skipped {} updates", client_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Handle incoming messages
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                debug!("Received message from {}: {}", client_id, text);
                let reply = handle_message(&state.engine, &text);
                if tx.send(reply.to_json()).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket client disconnecting: {}", client_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
                debug!("Received ping from {}", client_id);
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up
    send_task.abort();
    broadcast_task.abort();
    info!("WebSocket client disconnected: {}", client_id);
}

/// Apply one client action and build the reply.
fn handle_message(engine: &GameEngine, text: &str) -> ServerMessage {
    let action: ClientMessage = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(e) => {
            warn!("Invalid client message: {}", e);
            return ServerMessage::Error {
                error: format!("Invalid message: {}", e),
            };
        }
    };

    let accepted = engine.apply(action, Instant::now());
    ServerMessage::Ack { accepted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support;
    use space_surfer::types::SessionPhase;

    #[test]
    fn test_accepted_action_is_acked() {
        let engine = test_support::state().engine;
        let reply = handle_message(&engine, r#"{"type":"begin"}"#);

        assert!(matches!(reply, ServerMessage::Ack { accepted: true }));
        assert_eq!(engine.snapshot().session.phase, SessionPhase::Instructions);
    }

    #[test]
    fn test_inapplicable_action_is_rejected() {
        let engine = test_support::state().engine;
        let reply = handle_message(&engine, r#"{"type":"restart"}"#);

        assert!(matches!(reply, ServerMessage::Ack { accepted: false }));
        assert_eq!(engine.snapshot().session.phase, SessionPhase::Start);
    }

    #[test]
    fn test_invalid_message_returns_error() {
        let engine = test_support::state().engine;
        let reply = handle_message(&engine, r#"{"type":"jump"}"#);

        match reply {
            ServerMessage::Error { error } => assert!(error.starts_with("Invalid message")),
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
