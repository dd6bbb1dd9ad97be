use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SocketQuery {
    /// Identifies the subscriber so direct messages reach only them.
    pub player_id: Option<String>,
}

/// Chat line sent by a client. Lines from the current speaker feed the speech log.
#[derive(Debug, Serialize, Deserialize)]
struct IncomingChat {
    text: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, query.player_id))
}

pub async fn handle_socket(
    ws: WebSocket,
    state: AppState,
    room_id: String,
    player_id: Option<String>,
) {
    let connection_id = Uuid::new_v4();
    info!(room_id = %room_id, %connection_id, participant = ?player_id, "websocket connected");
    let mut rx = state.channels.subscribe(&room_id).await;
    let (mut sender, mut receiver) = ws.split();

    let send_room = room_id.clone();
    let viewer = player_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(room_id = %send_room, skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !event.is_visible_to(viewer.as_deref()) {
                continue;
            }
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(room_id = %send_room, error = %e, "failed to encode channel event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_room = room_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let Some(speaker) = player_id.as_deref() else {
                continue;
            };
            // JSON でなければそのまま発言として扱う
            let line = serde_json::from_str::<IncomingChat>(&text)
                .map(|chat| chat.text)
                .unwrap_or(text);
            match recv_state.game.capture_speech(&recv_room, speaker, &line).await {
                Ok(captured) => debug!(room_id = %recv_room, participant = speaker, captured, "chat line"),
                Err(e) => debug!(room_id = %recv_room, error = %e, "chat line ignored"),
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!(room_id = %room_id, %connection_id, "websocket disconnected");
}
