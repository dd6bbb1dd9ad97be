use tracing::info;

use super::{GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{
    game::GamePhase,
    player::Player,
    role::format_player_list,
    room::Room,
};
use crate::services::vote;

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    room.start_new_night();
    ctx.group_mute(room, true).await;
    ctx.announce(
        &room.room_id,
        &format!(
            "🌙 Night {} falls. Everyone close your eyes...\n\n🐺 Werewolves, choose tonight's victim.",
            room.round
        ),
    )
    .await;

    let wolves: Vec<String> = room.alive_werewolves().iter().map(|w| w.id.clone()).collect();
    let targets: Vec<&Player> = room
        .alive_players()
        .into_iter()
        .filter(|p| !p.is_werewolf())
        .collect();
    let prompt = format!(
        "🐺 Werewolf turn\n\n📋 Targets:\n{}\n\n💡 kill <seat> to vote, conspire <message> to talk to your pack.\n⏰ {} seconds",
        format_player_list(&targets),
        room.config.timeout_wolf
    );
    for wolf in &wolves {
        ctx.tell(&room.room_id, wolf, &prompt).await;
    }

    Transition::Wait(TimerPlan::secs(room.config.timeout_wolf))
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    ctx.announce(&room.room_id, "⏰ The werewolves ran out of time.").await;
    if room.night_votes.votes.is_empty() {
        room.log
            .wolf("🐺 The werewolves did not vote, nobody is attacked tonight");
        info!(room_id = %room.room_id, round = room.round, "no werewolf votes, no night kill");
    }
    settle(room, ctx)
}

pub async fn vote(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    target: &str,
) -> GameResult<Transition> {
    let wolf = room.require_player(actor)?;
    if !wolf.is_alive() {
        return Err(GameError::ActorDead);
    }
    let victim = room
        .get_player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;
    if !victim.is_alive() {
        return Err(GameError::TargetDead);
    }

    let entry = format!(
        "🐺 {} votes to kill {}",
        wolf.display_name(),
        victim.display_name()
    );
    room.night_votes
        .votes
        .insert(actor.to_string(), target.to_string());
    room.log.wolf(entry);

    let voted = room.night_votes.votes.len();
    let needed = room.alive_werewolves().len();
    ctx.tell(
        &room.room_id,
        actor,
        &format!("✅ Vote recorded. {}/{} werewolves have voted.", voted, needed),
    )
    .await;

    if voted >= needed {
        Ok(settle(room, ctx))
    } else {
        Ok(Transition::Stay)
    }
}

/// Relays a message from one living werewolf to the rest of the pack.
pub async fn conspire(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    message: &str,
) -> GameResult<Transition> {
    let wolf = room.require_player(actor)?;
    if !wolf.is_alive() {
        return Err(GameError::ActorDead);
    }
    let sender = wolf.display_name();
    let teammates: Vec<String> = room
        .alive_werewolves()
        .into_iter()
        .filter(|w| w.id != actor)
        .map(|w| w.id.clone())
        .collect();
    if teammates.is_empty() {
        return Err(GameError::NoTeammates);
    }

    let message = message.trim();
    room.log.wolf(format!("💬 {} (werewolf) whispers: {}", sender, message));
    let relayed = format!("🐺 {}: {}", sender, message);
    for teammate in &teammates {
        ctx.tell(&room.room_id, teammate, &relayed).await;
    }
    Ok(Transition::Stay)
}

fn settle(room: &mut Room, ctx: &GameContext) -> Transition {
    let victim = ctx.with_rng(|rng| vote::resolve_night(&room.night_votes.votes, rng));
    if let Some(victim) = victim {
        let name = room.display_name(&victim);
        room.log.wolf(format!("🌙 The werewolves settle on {}", name));
        info!(room_id = %room.room_id, victim = %victim, "night kill chosen");
        room.last_killed = Some(victim);
    }
    room.night_votes.clear();
    Transition::Enter(GamePhase::NightInvestigation)
}
