use tracing::{info, warn};

use super::{protection, GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{
    game::GamePhase,
    role::{DeathCause, HunterState},
    room::Room,
};
use crate::services::deaths;

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    let (hunter_id, cause) = match (
        room.hunter.pending_shot_player_id.clone(),
        room.hunter.death_cause,
    ) {
        (Some(id), Some(cause)) => (id, cause),
        _ => {
            warn!(room_id = %room.room_id, "retaliation entered without a pending shot");
            let cause = room.hunter.consume();
            return resume(room, ctx, cause).await;
        }
    };

    if let Some(prompt) = HunterState::death_prompt(cause, room.config.timeout_hunter) {
        ctx.tell(&room.room_id, &hunter_id, &prompt).await;
    }
    let name = room.display_name(&hunter_id);
    ctx.announce(
        &room.room_id,
        &format!("🔫 {} was the hunter and may take someone down with them!", name),
    )
    .await;

    Transition::Wait(TimerPlan::secs(room.config.timeout_hunter))
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    let hunter_id = room.hunter.pending_shot_player_id.clone();
    let cause = room.hunter.consume();
    if let Some(id) = hunter_id {
        let name = room.display_name(&id);
        room.log.public(format!("🔫 {} (hunter) did not shoot", name));
        ctx.announce(
            &room.room_id,
            &format!("⏰ {} did not shoot in time.", name),
        )
        .await;
    }
    resume(room, ctx, cause).await
}

pub async fn shoot(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    target: &str,
) -> GameResult<Transition> {
    let hunter = room.require_player(actor)?;
    if room.hunter.pending_shot_player_id.as_deref() != Some(actor) || !room.hunter.can_shoot() {
        return Err(GameError::NotYourTurn);
    }
    if target == actor {
        return Err(GameError::SelfTarget);
    }
    let victim = room
        .get_player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;
    if !victim.is_alive() {
        return Err(GameError::TargetDead);
    }

    let hunter_name = hunter.display_name();
    let victim_name = victim.display_name();
    room.kill_player(target);
    let cause = room.hunter.consume();
    room.log.public(format!(
        "🔫 {} (hunter) shot {}",
        hunter_name, victim_name
    ));
    info!(room_id = %room.room_id, hunter = actor, target, "hunter fired");
    ctx.mute(room, target).await;
    ctx.announce(
        &room.room_id,
        &format!("💥 Bang! {} was shot by the hunter. Alive: {}", victim_name, room.alive_summary()),
    )
    .await;

    Ok(resume(room, ctx, cause).await)
}

/// Victory check, then back to where the hunter's death interrupted.
async fn resume(room: &mut Room, ctx: &GameContext, cause: Option<DeathCause>) -> Transition {
    if let Some(outcome) = deaths::check_victory(room) {
        return Transition::GameOver(outcome);
    }
    match cause {
        Some(DeathCause::Vote) => {
            room.last_words_from_vote = true;
            Transition::Enter(GamePhase::LastWords)
        }
        _ => protection::day_break(room, ctx).await,
    }
}
