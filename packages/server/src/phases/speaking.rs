use tracing::info;

use super::{names, GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{game::GamePhase, room::Room};

const SPEECH_LOG_LIMIT: usize = 200;

pub async fn enter_day(room: &mut Room, ctx: &GameContext) -> Transition {
    let order = room.alive_ids();
    room.speaking.reset(order);
    ctx.group_mute(room, true).await;
    ctx.announce(
        &room.room_id,
        &format!(
            "☀️ Day {} discussion. Speaking order: {}",
            room.round,
            names(room, &room.speaking.order)
        ),
    )
    .await;
    next_speaker(room, ctx).await
}

pub async fn enter_runoff(room: &mut Room, ctx: &GameContext) -> Transition {
    let order = room.day_votes.pk_players.clone();
    room.speaking.reset(order);
    ctx.group_mute(room, true).await;
    ctx.announce(
        &room.room_id,
        &format!(
            "⚔️ Runoff! Tied players speak again: {}",
            names(room, &room.speaking.order)
        ),
    )
    .await;
    next_speaker(room, ctx).await
}

async fn next_speaker(room: &mut Room, ctx: &GameContext) -> Transition {
    let total = room.speaking.order.len();
    let index = room.speaking.current_index;
    let speaker = match room.speaking.order.get(index) {
        Some(id) => id.clone(),
        None => {
            room.speaking.current_speaker_id = None;
            return Transition::Enter(voting_phase(room.phase));
        }
    };

    room.speaking.current_speaker_id = Some(speaker.clone());
    room.speaking.current_speech.clear();
    ctx.grant_speaking(room, &speaker).await;

    let label = if room.phase == GamePhase::PkSpeaking {
        "Runoff speech"
    } else {
        "Your turn to speak"
    };
    ctx.mention(
        &room.room_id,
        &speaker,
        &format!(
            "🎤 {} ({}/{})\n⏰ {} seconds, finish with: done",
            label,
            index + 1,
            total,
            room.config.timeout_speaking
        ),
    )
    .await;

    Transition::Wait(TimerPlan::secs(room.config.timeout_speaking))
}

fn voting_phase(phase: GamePhase) -> GamePhase {
    if phase == GamePhase::PkSpeaking {
        GamePhase::PkVoting
    } else {
        GamePhase::DayVoting
    }
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    if let Some(speaker) = room.speaking.current_speaker_id.clone() {
        record_speech(room, &speaker);
        ctx.revoke_speaking(room, &speaker).await;
        let name = room.display_name(&speaker);
        ctx.announce(
            &room.room_id,
            &format!("⏰ {} ran out of time. Next speaker.", name),
        )
        .await;
    }
    room.speaking.current_index += 1;
    next_speaker(room, ctx).await
}

pub async fn finish(room: &mut Room, ctx: &GameContext, actor: &str) -> GameResult<Transition> {
    if room.speaking.current_speaker_id.as_deref() != Some(actor) {
        return Err(GameError::NotYourTurn);
    }
    record_speech(room, actor);
    ctx.revoke_speaking(room, actor).await;
    room.speaking.current_index += 1;
    Ok(next_speaker(room, ctx).await)
}

/// Room creator cuts the speaking round short and opens the vote.
pub async fn start_vote(room: &mut Room, ctx: &GameContext, actor: &str) -> GameResult<Transition> {
    if !room.is_creator(actor) {
        return Err(GameError::NotCreator);
    }
    if let Some(speaker) = room.speaking.current_speaker_id.take() {
        record_speech(room, &speaker);
        ctx.revoke_speaking(room, &speaker).await;
    }
    info!(room_id = %room.room_id, phase = %room.phase, "creator skipped to the vote");
    ctx.announce(&room.room_id, "⏭️ The host ended the discussion. Time to vote!")
        .await;
    Ok(Transition::Enter(voting_phase(room.phase)))
}

fn record_speech(room: &mut Room, speaker: &str) {
    let tag = if room.phase == GamePhase::PkSpeaking {
        "💬 Runoff speech"
    } else {
        "💬 Speech"
    };
    let text = room
        .speaking
        .transcript(SPEECH_LOG_LIMIT)
        .unwrap_or_else(|| "[no text captured]".to_string());
    let name = room.display_name(speaker);
    room.log.public(format!("{}: {} - {}", tag, name, text));
    room.speaking.current_speech.clear();
}

/// Shared with last words.
pub(crate) fn record_last_words(room: &mut Room, speaker: &str) {
    let text = room
        .speaking
        .transcript(SPEECH_LOG_LIMIT)
        .unwrap_or_else(|| "[no text captured]".to_string());
    let name = room.display_name(speaker);
    room.log.public(format!("💀 Last words: {} - {}", name, text));
    room.speaking.current_speech.clear();
}
