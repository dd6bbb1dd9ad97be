use super::{speaking::record_last_words, GameContext, TimerPlan, Transition};
use crate::error::{GameError, GameResult};
use crate::models::{game::GamePhase, room::Room};

pub async fn enter(room: &mut Room, ctx: &GameContext) -> Transition {
    let subject = match room.last_killed.clone() {
        Some(id) if room.get_player(&id).is_some() => id,
        _ => return resume(room),
    };

    room.speaking.current_speech.clear();
    ctx.group_mute(room, true).await;
    ctx.grant_speaking(room, &subject).await;
    ctx.mention(
        &room.room_id,
        &subject,
        &format!(
            "💀 Please give your last words.\n⏰ {} seconds, finish with: last words done",
            room.config.timeout_speaking
        ),
    )
    .await;

    Transition::Wait(TimerPlan::secs(room.config.timeout_speaking))
}

pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    if let Some(subject) = room.last_killed.clone() {
        record_last_words(room, &subject);
        close_floor(room, ctx, &subject).await;
    }
    ctx.announce(&room.room_id, "⏰ Last words are over.").await;
    resume(room)
}

pub async fn finish(room: &mut Room, ctx: &GameContext, actor: &str) -> GameResult<Transition> {
    if room.last_killed.as_deref() != Some(actor) {
        return Err(GameError::NotYourTurn);
    }
    record_last_words(room, actor);
    close_floor(room, ctx, actor).await;
    Ok(resume(room))
}

async fn close_floor(room: &mut Room, ctx: &GameContext, subject: &str) {
    ctx.revoke_speaking(room, subject).await;
    ctx.mute(room, subject).await;
    ctx.group_mute(room, true).await;
}

/// After a vote exile the night comes; after a night death the day discussion starts.
fn resume(room: &mut Room) -> Transition {
    room.end_first_round();
    if room.last_words_from_vote {
        room.last_words_from_vote = false;
        Transition::Enter(GamePhase::NightKill)
    } else {
        room.last_killed = None;
        Transition::Enter(GamePhase::DaySpeaking)
    }
}
