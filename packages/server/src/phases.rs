//! Phase controllers.
//!
//! Controllers are free functions over a locked [`Room`]. They never call
//! each other to move the game forward; instead every entry point returns a
//! [`Transition`] and `GameManager::drive` applies it.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{GameError, GameResult};
use crate::models::{
    game::{GamePhase, Outcome, PlayerAction, PlayerView},
    role::Role,
    room::Room,
};
use crate::services::collaborators::{AgentAction, AgentContext};

pub mod context;
pub mod investigation;
pub mod last_words;
pub mod night_kill;
pub mod protection;
pub mod retaliation;
pub mod speaking;
pub mod voting;

pub use context::GameContext;

/// How many public log lines an automated participant is shown.
const AGENT_HISTORY: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Keep waiting in the current phase; the armed timer stays armed.
    Stay,
    /// Arm the room timer for the current phase.
    Wait(TimerPlan),
    Enter(GamePhase),
    GameOver(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPlan {
    pub duration: Duration,
    /// Fire a reminder this long before the deadline.
    pub reminder: Option<Duration>,
}

impl TimerPlan {
    pub fn after(duration: Duration) -> Self {
        Self {
            duration,
            reminder: None,
        }
    }

    pub fn secs(secs: u64) -> Self {
        Self::after(Duration::from_secs(secs))
    }

    pub fn with_reminder(mut self, before: Duration) -> Self {
        if before < self.duration {
            self.reminder = Some(before);
        }
        self
    }
}

/// Sets the room's phase and runs that phase's entry behaviour.
pub async fn enter(room: &mut Room, ctx: &GameContext, phase: GamePhase) -> Transition {
    let from = room.phase;
    room.phase = phase;
    info!(room_id = %room.room_id, from = %from, phase = %phase, round = room.round, "entering phase");

    match phase {
        GamePhase::NightKill => night_kill::enter(room, ctx).await,
        GamePhase::NightInvestigation => investigation::enter(room, ctx).await,
        GamePhase::NightProtection => protection::enter(room, ctx).await,
        GamePhase::LastWords => last_words::enter(room, ctx).await,
        GamePhase::DaySpeaking => speaking::enter_day(room, ctx).await,
        GamePhase::PkSpeaking => speaking::enter_runoff(room, ctx).await,
        GamePhase::DayVoting | GamePhase::PkVoting => voting::enter(room, ctx).await,
        GamePhase::Retaliation => retaliation::enter(room, ctx).await,
        GamePhase::Waiting | GamePhase::Finished => Transition::Stay,
    }
}

/// The armed timer for the current phase ran out.
pub async fn timeout(room: &mut Room, ctx: &GameContext) -> Transition {
    info!(room_id = %room.room_id, phase = %room.phase, "phase timed out");
    match room.phase {
        GamePhase::NightKill => night_kill::timeout(room, ctx).await,
        GamePhase::NightInvestigation => investigation::timeout(room, ctx).await,
        GamePhase::NightProtection => protection::timeout(room, ctx).await,
        GamePhase::LastWords => last_words::timeout(room, ctx).await,
        GamePhase::DaySpeaking | GamePhase::PkSpeaking => speaking::timeout(room, ctx).await,
        GamePhase::DayVoting | GamePhase::PkVoting => voting::timeout(room, ctx).await,
        GamePhase::Retaliation => retaliation::timeout(room, ctx).await,
        GamePhase::Waiting | GamePhase::Finished => Transition::Stay,
    }
}

/// Mid-phase reminder from the same timer.
pub async fn remind(room: &mut Room, ctx: &GameContext) -> Transition {
    if room.phase.is_voting() {
        voting::remind(room, ctx).await;
    }
    Transition::Stay
}

/// Validates and applies one participant action. Rejections leave the room untouched.
pub async fn handle_action(
    room: &mut Room,
    ctx: &GameContext,
    actor: &str,
    action: PlayerAction,
) -> GameResult<Transition> {
    let player = room.require_player(actor)?;
    if room.phase == GamePhase::Waiting {
        return Err(GameError::NotStarted);
    }
    if let Some(command) = action.role_command() {
        if command.phase() != room.phase {
            return Err(GameError::WrongPhase(room.phase));
        }
        if !player.role.map_or(false, |role| role.can_issue(command)) {
            return Err(GameError::WrongRole);
        }
    }
    debug!(room_id = %room.room_id, participant = actor, phase = %room.phase, action = ?action, "action submitted");

    match (room.phase, action) {
        (GamePhase::NightKill, PlayerAction::NightKill { target }) => {
            night_kill::vote(room, ctx, actor, &target).await
        }
        (GamePhase::NightKill, PlayerAction::Conspire { message }) => {
            night_kill::conspire(room, ctx, actor, &message).await
        }
        (GamePhase::NightInvestigation, PlayerAction::Investigate { target }) => {
            investigation::investigate(room, ctx, actor, &target).await
        }
        (GamePhase::NightProtection, PlayerAction::Save) => protection::save(room, ctx, actor).await,
        (GamePhase::NightProtection, PlayerAction::Poison { target }) => {
            protection::poison(room, ctx, actor, &target).await
        }
        (GamePhase::NightProtection, PlayerAction::Pass) => protection::pass(room, ctx, actor).await,
        (GamePhase::Retaliation, PlayerAction::Retaliate { target }) => {
            retaliation::shoot(room, ctx, actor, &target).await
        }
        (GamePhase::DaySpeaking | GamePhase::PkSpeaking, PlayerAction::FinishSpeaking) => {
            speaking::finish(room, ctx, actor).await
        }
        (GamePhase::DaySpeaking | GamePhase::PkSpeaking, PlayerAction::StartVote) => {
            speaking::start_vote(room, ctx, actor).await
        }
        (GamePhase::LastWords, PlayerAction::FinishLastWords) => {
            last_words::finish(room, ctx, actor).await
        }
        (GamePhase::DayVoting | GamePhase::PkVoting, PlayerAction::Vote { target }) => {
            voting::vote(room, ctx, actor, &target).await
        }
        (phase, _) => Err(GameError::WrongPhase(phase)),
    }
}

/// Appends captured chat to the speech buffer of whoever holds the floor.
pub fn capture_speech(room: &mut Room, actor: &str, text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    let holds_floor = match room.phase {
        GamePhase::DaySpeaking | GamePhase::PkSpeaking => {
            room.speaking.current_speaker_id.as_deref() == Some(actor)
        }
        GamePhase::LastWords => room.last_killed.as_deref() == Some(actor),
        _ => false,
    };
    if holds_floor {
        room.speaking.current_speech.push(text.to_string());
    }
    holds_floor
}

/// Automated participants the current phase is still waiting on, in seat order.
pub fn awaiting_agents(room: &Room) -> Vec<String> {
    let automated = |id: &str| room.get_player(id).map(|p| p.automated).unwrap_or(false);

    match room.phase {
        GamePhase::NightKill => room
            .alive_werewolves()
            .into_iter()
            .filter(|w| w.automated && !room.night_votes.votes.contains_key(&w.id))
            .map(|w| w.id.clone())
            .collect(),
        GamePhase::NightInvestigation => room
            .role_holder(Role::Seer)
            .filter(|s| s.automated && s.is_alive() && !room.seer_checked)
            .map(|s| vec![s.id.clone()])
            .unwrap_or_default(),
        GamePhase::NightProtection => room
            .role_holder(Role::Witch)
            .filter(|w| w.automated && w.is_alive() && !room.witch.has_acted)
            .map(|w| vec![w.id.clone()])
            .unwrap_or_default(),
        GamePhase::DaySpeaking | GamePhase::PkSpeaking => room
            .speaking
            .current_speaker_id
            .iter()
            .filter(|id| automated(id))
            .cloned()
            .collect(),
        GamePhase::LastWords => room
            .last_killed
            .iter()
            .filter(|id| automated(id))
            .cloned()
            .collect(),
        GamePhase::DayVoting | GamePhase::PkVoting => room
            .alive_players()
            .into_iter()
            .filter(|p| p.automated && !room.day_votes.votes.contains_key(&p.id))
            .map(|p| p.id.clone())
            .collect(),
        GamePhase::Retaliation => room
            .hunter
            .pending_shot_player_id
            .iter()
            .filter(|id| automated(id))
            .cloned()
            .collect(),
        GamePhase::Waiting | GamePhase::Finished => Vec::new(),
    }
}

/// What an automated participant sees before choosing.
pub fn agent_context(room: &Room, actor: &str) -> AgentContext {
    let others_alive = || -> Vec<String> {
        room.alive_players()
            .into_iter()
            .filter(|p| p.id != actor)
            .map(|p| p.id.clone())
            .collect()
    };
    let candidates = match room.phase {
        GamePhase::NightKill => room
            .alive_players()
            .into_iter()
            .filter(|p| !p.is_werewolf())
            .map(|p| p.id.clone())
            .collect(),
        GamePhase::NightInvestigation | GamePhase::Retaliation => others_alive(),
        GamePhase::NightProtection => match &room.last_killed {
            Some(victim) if room.witch.can_save() => vec![victim.clone()],
            _ => Vec::new(),
        },
        GamePhase::DayVoting => others_alive(),
        GamePhase::PkVoting => {
            let pk: Vec<String> = room
                .day_votes
                .pk_players
                .iter()
                .filter(|id| id.as_str() != actor)
                .cloned()
                .collect();
            if pk.is_empty() {
                room.day_votes.pk_players.clone()
            } else {
                pk
            }
        }
        _ => Vec::new(),
    };

    AgentContext {
        room_id: room.room_id.clone(),
        player_id: actor.to_string(),
        role: room.get_player(actor).and_then(|p| p.role),
        phase: room.phase,
        round: room.round,
        alive: room
            .alive_players()
            .into_iter()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                seat: p.seat,
                alive: true,
                automated: p.automated,
            })
            .collect(),
        candidates,
        recent_events: room.log.recent_public(AGENT_HISTORY),
    }
}

/// Turns an agent's answer (or its absence) into an action for the current phase.
/// Speech is written straight into the speaking buffer. `None` means the agent abstains.
pub fn agent_action(room: &mut Room, actor: &str, answer: Option<AgentAction>) -> Option<PlayerAction> {
    let target = match &answer {
        Some(AgentAction::Target(t)) => Some(t.clone()),
        _ => None,
    };

    match room.phase {
        GamePhase::NightKill => target.map(|target| PlayerAction::NightKill { target }),
        GamePhase::NightInvestigation => target.map(|target| PlayerAction::Investigate { target }),
        GamePhase::NightProtection => match target {
            Some(t) if room.last_killed.as_deref() == Some(t.as_str()) => Some(PlayerAction::Save),
            Some(target) => Some(PlayerAction::Poison { target }),
            None => Some(PlayerAction::Pass),
        },
        GamePhase::DaySpeaking | GamePhase::PkSpeaking | GamePhase::LastWords => {
            let speech = match answer {
                Some(AgentAction::Speech(text)) => text,
                _ => crate::services::agent::DEFAULT_UTTERANCE.to_string(),
            };
            capture_speech(room, actor, &speech);
            if room.phase == GamePhase::LastWords {
                Some(PlayerAction::FinishLastWords)
            } else {
                Some(PlayerAction::FinishSpeaking)
            }
        }
        GamePhase::DayVoting | GamePhase::PkVoting => target.map(|target| PlayerAction::Vote { target }),
        GamePhase::Retaliation => target.map(|target| PlayerAction::Retaliate { target }),
        GamePhase::Waiting | GamePhase::Finished => None,
    }
}

/// Formats a display-name list for the given ids.
pub(crate) fn names(room: &Room, ids: &[String]) -> String {
    ids.iter()
        .map(|id| room.display_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}
