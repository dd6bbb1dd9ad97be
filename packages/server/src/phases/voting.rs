use std::time::Duration;

use tracing::{info, warn};

use super::{names, GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{game::GamePhase, room::Room};
use crate::services::{
    deaths,
    vote::{self, DayOutcome},
};

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    room.day_votes.votes.clear();
    room.day_votes.is_runoff = room.phase == GamePhase::PkVoting;
    ctx.group_mute(room, false).await;

    let text = if room.day_votes.is_runoff {
        format!(
            "🗳️ Runoff vote! You may only vote for: {}\n⏰ {} seconds",
            names(room, &room.day_votes.pk_players),
            room.config.timeout_vote
        )
    } else {
        let alive = room.alive_ids();
        format!(
            "🗳️ Time to vote! Alive: {}\n⏰ {} seconds, vote with: vote <seat>",
            names(room, &alive),
            room.config.timeout_vote
        )
    };
    ctx.announce(&room.room_id, &text).await;

    Transition::Wait(
        TimerPlan::secs(room.config.timeout_vote)
            .with_reminder(Duration::from_secs(room.config.vote_reminder_secs)),
    )
}

pub async fn remind(room: &mut Room, ctx: &GameContext) {
    ctx.announce(
        &room.room_id,
        &format!(
            "⏰ {} seconds left to vote! {}/{} have voted.",
            room.config.vote_reminder_secs,
            room.day_votes.votes.len(),
            room.alive_count()
        ),
    )
    .await;
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    ctx.announce(
        &room.room_id,
        &format!(
            "⏰ Voting closed. {}/{} voted.",
            room.day_votes.votes.len(),
            room.alive_count()
        ),
    )
    .await;
    if room.day_votes.votes.is_empty() {
        room.log.public("📊 Nobody voted, nobody is exiled this round");
        room.day_votes.clear();
        return Transition::Enter(GamePhase::NightKill);
    }
    resolve(room, ctx).await
}

pub async fn vote(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    target: &str,
) -> GameResult<Transition> {
    let voter = room.require_player(actor)?;
    if !voter.is_alive() {
        return Err(GameError::ActorDead);
    }
    let choice = room
        .get_player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;
    if !choice.is_alive() {
        return Err(GameError::TargetDead);
    }
    if room.day_votes.is_runoff && !room.day_votes.pk_players.iter().any(|id| id == target) {
        return Err(GameError::OutsideRunoff);
    }

    let tag = if room.day_votes.is_runoff {
        "🗳️ Runoff vote"
    } else {
        "🗳️ Vote"
    };
    let entry = format!("{}: {} → {}", tag, voter.display_name(), choice.display_name());
    room.day_votes
        .votes
        .insert(actor.to_string(), target.to_string());
    room.log.public(entry);

    let voted = room.day_votes.votes.len();
    let alive = room.alive_count();
    ctx.tell(
        &room.room_id,
        actor,
        &format!("✅ Vote recorded. {}/{} have voted.", voted, alive),
    )
    .await;

    if voted >= alive {
        Ok(resolve(room, ctx).await)
    } else {
        Ok(Transition::Stay)
    }
}

async fn resolve(room: &mut Room, ctx: &GameContext) -> Transition {
    let ballots = room.day_votes.votes.clone();
    let is_runoff = room.day_votes.is_runoff;
    let outcome = vote::resolve_day(&ballots, is_runoff);

    let mut text = String::from("📊 Vote result\n");
    let grouped = vote::voters_by_target(&ballots);
    let mut rows: Vec<(usize, String)> = grouped
        .iter()
        .map(|(target, voters)| {
            (
                voters.len(),
                format!(
                    "  {}: {} ({})",
                    room.display_name(target),
                    voters.len(),
                    names(room, voters)
                ),
            )
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, row) in rows {
        text.push('\n');
        text.push_str(&row);
    }
    ctx.announce(&room.room_id, &text).await;

    match outcome {
        DayOutcome::NoVotes => {
            warn!(room_id = %room.room_id, "vote resolved with no ballots, moving on to night");
            room.log.public("📊 No ballots to count, nobody is exiled");
            room.day_votes.clear();
            Transition::Enter(GamePhase::NightKill)
        }
        DayOutcome::Runoff(mut tied) => {
            tied.sort_by_key(|id| room.get_player(id).map(|p| p.seat).unwrap_or(u32::MAX));
            room.log
                .public(format!("📊 Tie between {}, runoff", names(room, &tied)));
            info!(room_id = %room.room_id, tied = ?tied, "day vote tied, entering runoff");
            room.day_votes.votes.clear();
            room.day_votes.is_runoff = false;
            room.day_votes.pk_players = tied;
            Transition::Enter(GamePhase::PkSpeaking)
        }
        DayOutcome::Deadlock(tied) => {
            room.log.public(format!(
                "📊 Runoff tied again between {}, nobody is exiled",
                names(room, &tied)
            ));
            ctx.announce(
                &room.room_id,
                "⚖️ The runoff is tied again. Nobody is exiled today.",
            )
            .await;
            room.day_votes.clear();
            Transition::Enter(GamePhase::NightKill)
        }
        DayOutcome::Exile(exiled) => {
            room.day_votes.clear();
            let name = room.display_name(&exiled);
            let hunter_shot = deaths::exile(room, &exiled);
            room.log.public(format!(
                "📊 {}{} was exiled by the village",
                if is_runoff { "Runoff: " } else { "" },
                name
            ));
            info!(room_id = %room.room_id, exiled = %exiled, runoff = is_runoff, "participant exiled");
            ctx.announce(
                &room.room_id,
                &format!("⚰️ {} has been exiled. Alive: {}", name, room.alive_summary()),
            )
            .await;

            if hunter_shot {
                return Transition::Enter(GamePhase::Retaliation);
            }
            if let Some(outcome) = deaths::check_victory(room) {
                return Transition::GameOver(outcome);
            }
            Transition::Enter(GamePhase::LastWords)
        }
    }
}
