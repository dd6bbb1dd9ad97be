use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::{config::ConfigError, game::GamePhase};

/// Reasons an inbound request is rejected. A rejected request never changes room state.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("room {0} already exists")]
    RoomExists(String),
    #[error("room is full ({0} players)")]
    RoomFull(usize),
    #[error("{0} has already joined")]
    AlreadyJoined(String),
    #[error("{0} is already playing in room {1}")]
    InAnotherRoom(String, String),
    #[error("{0} is not in this room")]
    NotInRoom(String),
    #[error("{needed} players are required, {actual} have joined")]
    NotEnoughPlayers { needed: usize, actual: usize },
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the game has not started")]
    NotStarted,
    #[error("only the room creator can do that")]
    NotCreator,
    #[error("that action is not accepted during {0}")]
    WrongPhase(GamePhase),
    #[error("your role cannot do that")]
    WrongRole,
    #[error("dead players cannot act")]
    ActorDead,
    #[error("unknown target {0}")]
    UnknownTarget(String),
    #[error("that player is already dead")]
    TargetDead,
    #[error("you cannot target yourself")]
    SelfTarget,
    #[error("you have already acted")]
    AlreadyActed,
    #[error("the {0} has already been used")]
    PotionUsed(&'static str),
    #[error("nobody was attacked tonight")]
    NoKillTonight,
    #[error("that player is not part of the runoff")]
    OutsideRunoff,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("no other werewolf is alive")]
    NoTeammates,
    #[error("role list has {actual} entries for {expected} players")]
    RoleListMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_) | GameError::NotInRoom(_) => StatusCode::NOT_FOUND,
            GameError::NotCreator => StatusCode::FORBIDDEN,
            GameError::RoomExists(_)
            | GameError::RoomFull(_)
            | GameError::AlreadyJoined(_)
            | GameError::InAnotherRoom(_, _)
            | GameError::AlreadyStarted => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
