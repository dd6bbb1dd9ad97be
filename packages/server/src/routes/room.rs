use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::GameError,
    models::config::GameConfig,
    services::room_service,
    state::AppState,
    utils::websocket,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub creator_id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub config: Option<GameConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub player_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub automated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveRoomRequest {
    pub requester_id: String,
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequesterQuery {
    pub requester_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム作成
        // curl -X POST http://localhost:8080/api/room/create -H 'Content-Type: application/json' -d '{"creator_id":"host"}'
        .route("/create", post(create_room))
        // ルーム一覧取得
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // 特定のルーム情報取得
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        // ルーム参加
        // curl -X POST http://localhost:8080/api/room/{roomid}/join -H 'Content-Type: application/json' -d '{"player_id":"p1","name":"Alice"}'
        .route("/:roomid/join", post(join_room))
        // ルーム脱退（作成者による追放を含む）
        // curl -X POST http://localhost:8080/api/room/{roomid}/leave -H 'Content-Type: application/json' -d '{"requester_id":"host","player_id":"p1"}'
        .route("/:roomid/leave", post(leave_room))
        // ルーム削除
        // curl -X DELETE 'http://localhost:8080/api/room/{roomid}/delete?requester_id=host'
        .route("/:roomid/delete", delete(delete_room))
        // WebSocket接続
        // websocat 'ws://localhost:8080/api/room/{roomid}/ws?player_id=p1'
        .route("/:roomid/ws", get(websocket::handler))
        .with_state(state)
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, GameError> {
    let snapshot = room_service::create_room(&state, &req.creator_id, req.room_id, req.config).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

async fn get_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = room_service::get_rooms(&state).await;
    (StatusCode::OK, Json(rooms))
}

async fn get_room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    let room = room_service::get_room_info(&state, &room_id).await?;
    Ok((StatusCode::OK, Json(room)))
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, GameError> {
    let snapshot =
        room_service::join_room(&state, &room_id, &req.player_id, req.name, req.automated).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<LeaveRoomRequest>,
) -> Result<impl IntoResponse, GameError> {
    room_service::leave_room(&state, &room_id, &req.requester_id, &req.player_id).await?;
    Ok((StatusCode::OK, Json("Successfully left room")))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<RequesterQuery>,
) -> Result<impl IntoResponse, GameError> {
    room_service::delete_room(&state, &room_id, &query.requester_id).await?;
    Ok((
        StatusCode::OK,
        Json(format!("Room {} deleted successfully", room_id)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::RoomSnapshot;
    use crate::services::collaborators::Collaborators;
    use axum::{body::to_bytes, body::Body, http::Request};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::with_collaborators(GameConfig::default(), Collaborators::silent(), Some(3))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_room() {
        let app = routes(state());

        let response = app
            .oneshot(post_json("/create", serde_json::json!({"creator_id": "host"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let room: RoomSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(room.room_id, "1");
        assert_eq!(room.creator_id, "host");
    }

    #[tokio::test]
    async fn test_get_rooms() {
        let state = state();
        let app = routes(state.clone());
        room_service::create_room(&state, "host", Some("alpha".into()), None)
            .await
            .unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/rooms")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let rooms: Vec<RoomSnapshot> = serde_json::from_slice(&body).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "alpha");
    }

    #[tokio::test]
    async fn test_unknown_room_is_404() {
        let app = routes(state());
        let request = Request::builder()
            .uri("/nowhere")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_join_is_conflict() {
        let state = state();
        room_service::create_room(&state, "host", Some("r".into()), None)
            .await
            .unwrap();
        let body = serde_json::json!({"player_id": "p1"});

        let first = routes(state.clone())
            .oneshot(post_json("/r/join", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = routes(state)
            .oneshot(post_json("/r/join", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }
}
