use tracing::info;

use crate::{
    error::GameResult,
    models::{config::GameConfig, game::RoomSnapshot, player::Player},
    state::AppState,
};

/// Creates a room. Without an explicit id the next free numeric id is used.
pub async fn create_room(
    state: &AppState,
    creator_id: &str,
    room_id: Option<String>,
    config: Option<GameConfig>,
) -> GameResult<RoomSnapshot> {
    let room_id = match room_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => next_room_id(state).await,
    };
    let snapshot = state.game.create_room(&room_id, creator_id, config).await?;
    state.channels.get_or_create(&room_id).await;
    Ok(snapshot)
}

async fn next_room_id(state: &AppState) -> String {
    let next = state
        .game
        .room_ids()
        .await
        .iter()
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    next.to_string()
}

pub async fn join_room(
    state: &AppState,
    room_id: &str,
    player_id: &str,
    name: Option<String>,
    automated: bool,
) -> GameResult<RoomSnapshot> {
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Player {}", player_id));
    let mut player = Player::new(player_id, name);
    if automated {
        player = player.automated();
    }
    state.game.join_room(room_id, player).await
}

pub async fn leave_room(
    state: &AppState,
    room_id: &str,
    requester_id: &str,
    player_id: &str,
) -> GameResult<()> {
    state.game.eject(room_id, requester_id, player_id).await
}

pub async fn get_rooms(state: &AppState) -> Vec<RoomSnapshot> {
    state.game.list_rooms().await
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> GameResult<RoomSnapshot> {
    state.game.snapshot(room_id).await
}

pub async fn delete_room(state: &AppState, room_id: &str, requester_id: &str) -> GameResult<()> {
    state.game.end_room(room_id, requester_id).await?;
    state.channels.remove(room_id).await;
    info!(room_id, "room deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::services::collaborators::Collaborators;

    fn state() -> AppState {
        AppState::with_collaborators(GameConfig::default(), Collaborators::silent(), Some(1))
    }

    #[tokio::test]
    async fn generated_room_ids_count_up() {
        let state = state();
        let first = create_room(&state, "host", None, None).await.unwrap();
        let second = create_room(&state, "host", None, None).await.unwrap();
        assert_eq!(first.room_id, "1");
        assert_eq!(second.room_id, "2");
    }

    #[tokio::test]
    async fn join_fills_in_a_default_name() {
        let state = state();
        create_room(&state, "host", Some("r".into()), None).await.unwrap();
        let snapshot = join_room(&state, "r", "p1", None, false).await.unwrap();
        assert_eq!(snapshot.players[0].name, "Player p1");
    }

    #[tokio::test]
    async fn only_the_creator_can_delete() {
        let state = state();
        create_room(&state, "host", Some("r".into()), None).await.unwrap();
        assert_eq!(
            delete_room(&state, "r", "someone").await,
            Err(GameError::NotCreator)
        );
        delete_room(&state, "r", "host").await.unwrap();
        assert!(get_rooms(&state).await.is_empty());
    }
}
