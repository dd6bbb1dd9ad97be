use tracing::info;

use super::{GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{
    game::GamePhase,
    player::Player,
    role::{format_player_list, Role},
    room::Room,
};

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    room.seer_checked = false;

    let (seer_id, seer_alive) = match room.role_holder(Role::Seer) {
        Some(seer) => (seer.id.clone(), seer.is_alive()),
        None => {
            info!(room_id = %room.room_id, "no seer in this game, skipping investigation");
            return Transition::Enter(GamePhase::NightProtection);
        }
    };

    ctx.announce(&room.room_id, "🔮 Seer, open your eyes and choose someone to check.")
        .await;

    if seer_alive {
        let others: Vec<&Player> = room
            .alive_players()
            .into_iter()
            .filter(|p| p.id != seer_id)
            .collect();
        let prompt = format!(
            "🔮 Seer turn\n\n📋 You may check:\n{}\n\n💡 investigate <seat>\n⏰ {} seconds",
            format_player_list(&others),
            room.config.timeout_seer
        );
        ctx.tell(&room.room_id, &seer_id, &prompt).await;
        Transition::Wait(TimerPlan::secs(room.config.timeout_seer))
    } else {
        // 死亡済みでも短い待機時間を置く
        Transition::Wait(TimerPlan::after(ctx.dead_wait(&room.config)))
    }
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    room.seer_checked = true;
    let seer_alive = room
        .role_holder(Role::Seer)
        .map(|s| s.is_alive())
        .unwrap_or(false);
    if seer_alive {
        ctx.announce(&room.room_id, "⏰ The seer ran out of time.").await;
    }
    Transition::Enter(GamePhase::NightProtection)
}

pub async fn investigate(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    target: &str,
) -> GameResult<Transition> {
    let seer = room.require_player(actor)?;
    if !seer.is_alive() {
        return Err(GameError::ActorDead);
    }
    if room.seer_checked {
        return Err(GameError::AlreadyActed);
    }
    if target == actor {
        return Err(GameError::SelfTarget);
    }
    let checked = room
        .get_player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;
    if !checked.is_alive() {
        return Err(GameError::TargetDead);
    }

    let seer_name = seer.display_name();
    let checked_name = checked.display_name();
    let verdict = if checked.is_werewolf() {
        "a werewolf 🐺"
    } else {
        "on the village's side 👤"
    };

    room.seer_checked = true;
    room.log.secret(format!(
        "🔮 {} (seer) checked {}: {}",
        seer_name, checked_name, verdict
    ));
    ctx.tell(
        &room.room_id,
        actor,
        &format!("🔮 Result: {} is {}.", checked_name, verdict),
    )
    .await;

    Ok(Transition::Enter(GamePhase::NightProtection))
}
