//! WebSocket endpoint for live viewers.
//!
//! Each connection gets its own broadcaster subscription and its own task.
//! Frames are `{"event": <name>, "data": <payload>}` text messages.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chainlive_core::FanoutMessage;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::state::AppState;

/// Event name of the optional first frame carrying the recent buffers.
pub const SNAPSHOT_EVENT: &str = "snapshot";

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Send the current recent blocks/transactions before live events.
    #[serde(default)]
    pub backfill: bool,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.backfill))
}

async fn handle_socket(socket: WebSocket, state: AppState, backfill: bool) {
    // Subscribe before taking the snapshot so no block falls in between.
    let mut subscription = state.broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(
        subscribers = state.broadcaster.subscriber_count(),
        backfill,
        "Viewer connected"
    );

    if backfill {
        let frame = serde_json::to_value(state.aggregator.snapshot())
            .and_then(|snapshot| FanoutMessage::new(SNAPSHOT_EVENT, Arc::new(snapshot)).to_frame());
        match frame {
            Ok(text) => {
                if sender.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode snapshot"),
        }
    }

    loop {
        tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else { break };
                let text = match message.to_frame() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, event = message.event(), "Failed to encode frame");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    // viewers are receive-only
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("Viewer disconnected");
}
