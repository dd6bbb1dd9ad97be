use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{error::GameError, models::game::PlayerAction, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct RequesterBody {
    pub requester_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    pub player_id: String,
    /// Targets may be given as a seat number or a participant id.
    pub action: PlayerAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub player_id: String,
    pub text: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                // ゲームの基本操作
                // curl -X POST http://localhost:8080/api/game/{roomid}/start -H 'Content-Type: application/json' -d '{"requester_id":"host"}'
                .route("/start", post(start_game))
                .route("/end", post(end_game_handler))
                .route("/state", get(get_game_state))
                .route("/outcome", get(get_outcome))
                // ゲームアクション
                // curl -X POST http://localhost:8080/api/game/{roomid}/actions -H 'Content-Type: application/json' -d '{"player_id":"p1","action":{"kind":"vote","target":"3"}}'
                .route("/actions", post(action_handler))
                .route("/speech", post(speech_handler)),
        )
        .with_state(state)
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<RequesterBody>,
) -> Result<impl IntoResponse, GameError> {
    state.game.start_game(&room_id, &body.requester_id).await?;
    Ok((StatusCode::OK, Json(state.game.snapshot(&room_id).await.ok())))
}

async fn end_game_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<RequesterBody>,
) -> Result<impl IntoResponse, GameError> {
    state.game.end_room(&room_id, &body.requester_id).await?;
    state.channels.remove(&room_id).await;
    Ok((StatusCode::OK, Json(format!("Game in room {} ended", room_id))))
}

pub async fn get_game_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    let snapshot = state.game.snapshot(&room_id).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

async fn get_outcome(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    let outcome = state
        .game
        .outcome(&room_id)
        .await
        .ok_or_else(|| GameError::RoomNotFound(room_id.clone()))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "winner": outcome.winner,
            "reason": outcome.reason,
            "message": outcome.message(),
        })),
    ))
}

async fn action_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, GameError> {
    let mut action = req.action;
    if let Some(target) = action.target_mut() {
        *target = state.game.resolve_target(&room_id, target).await?;
    }
    state.game.submit(&room_id, &req.player_id, action).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

async fn speech_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<SpeechRequest>,
) -> Result<impl IntoResponse, GameError> {
    let captured = state
        .game
        .capture_speech(&room_id, &req.player_id, &req.text)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "captured": captured }))))
}
