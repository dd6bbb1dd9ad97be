use tracing::info;

use super::{GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{
    game::GamePhase,
    player::Player,
    role::Role,
    room::Room,
};
use crate::services::deaths;

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    let (witch_id, witch_alive) = match room.role_holder(Role::Witch) {
        Some(witch) => (witch.id.clone(), witch.is_alive()),
        None => {
            info!(room_id = %room.room_id, "no witch in this game, skipping protection");
            return finish_night(room, ctx).await;
        }
    };
    let killed_tonight = room.last_killed.as_deref() == Some(witch_id.as_str());

    ctx.announce(&room.room_id, "💊 Witch, open your eyes.").await;

    if witch_alive || killed_tonight {
        let victim: Option<&Player> = room.last_killed.as_deref().and_then(|id| room.get_player(id));
        let prompt = format!(
            "{}\n⏰ {} seconds",
            room.witch.action_prompt(victim),
            room.config.timeout_witch
        );
        ctx.tell(&room.room_id, &witch_id, &prompt).await;
        Transition::Wait(TimerPlan::secs(room.config.timeout_witch))
    } else {
        Transition::Wait(TimerPlan::after(ctx.dead_wait(&room.config)))
    }
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    room.witch.has_acted = true;
    let witch_alive = room
        .role_holder(Role::Witch)
        .map(|w| w.is_alive())
        .unwrap_or(false);
    if witch_alive {
        ctx.announce(&room.room_id, "⏰ The witch ran out of time.").await;
    }
    finish_night(room, ctx).await
}

fn check_witch(room: &Room, actor: &str) -> GameResult<()> {
    let witch = room.require_player(actor)?;
    if !witch.is_alive() {
        return Err(GameError::ActorDead);
    }
    if room.witch.has_acted {
        return Err(GameError::AlreadyActed);
    }
    Ok(())
}

pub async fn save(room: &mut Room, ctx: &GameContext, actor: &str) -> GameResult<Transition> {
    check_witch(room, actor)?;
    if !room.witch.can_save() {
        return Err(GameError::PotionUsed("antidote"));
    }
    let victim = room.last_killed.clone().ok_or(GameError::NoKillTonight)?;

    let name = room.display_name(&victim);
    room.witch.antidote_used = true;
    room.witch.saved_player_id = Some(victim);
    room.witch.has_acted = true;
    room.log.secret(format!("💉 The witch used the antidote on {}", name));
    ctx.tell(&room.room_id, actor, &format!("✅ You saved {}.", name))
        .await;

    Ok(finish_night(room, ctx).await)
}

pub async fn poison(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    target: &str,
) -> GameResult<Transition> {
    check_witch(room, actor)?;
    if !room.witch.can_poison() {
        return Err(GameError::PotionUsed("poison"));
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

    let name = victim.display_name();
    room.witch.poison_used = true;
    room.witch.poisoned_player_id = Some(target.to_string());
    room.witch.has_acted = true;
    room.log.secret(format!("💊 The witch poisoned {}", name));
    ctx.tell(&room.room_id, actor, &format!("✅ You poisoned {}.", name))
        .await;

    Ok(finish_night(room, ctx).await)
}

pub async fn pass(room: &mut Room, ctx: &GameContext, actor: &str) -> GameResult<Transition> {
    check_witch(room, actor)?;
    room.witch.has_acted = true;
    room.log.secret("💊 The witch did nothing tonight");
    ctx.tell(&room.room_id, actor, "✅ You chose not to act.").await;
    Ok(finish_night(room, ctx).await)
}

/// Dawn: apply the night's deaths, announce them and pick the way into the day.
pub async fn finish_night(room: &mut Room, ctx: &GameContext) -> Transition {
    let report = deaths::settle_night(room);
    info!(
        room_id = %room.room_id,
        killed = ?report.killed,
        poisoned = ?report.poisoned,
        saved = report.saved.is_some(),
        "night resolved"
    );
    if let Some(poisoned) = report.poisoned.clone() {
        ctx.mute(room, &poisoned).await;
    }
    let dawn = deaths::dawn_message(room, &report);
    ctx.announce(&room.room_id, &dawn).await;

    // 狩人の反撃は勝敗判定より先
    if room.hunter.pending_shot_player_id.is_some() {
        return Transition::Enter(GamePhase::Retaliation);
    }
    if let Some(outcome) = deaths::check_victory(room) {
        return Transition::GameOver(outcome);
    }
    day_break(room, ctx).await
}

/// First-night victims get last words; otherwise the dead are muted and the day starts.
pub async fn day_break(room: &mut Room, ctx: &GameContext) -> Transition {
    if room.is_first_round && room.last_killed.is_some() {
        return Transition::Enter(GamePhase::LastWords);
    }
    if let Some(killed) = room.last_killed.clone() {
        ctx.mute(room, &killed).await;
    }
    room.end_first_round();
    Transition::Enter(GamePhase::DaySpeaking)
}
