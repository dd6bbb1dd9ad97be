//! Death bookkeeping between phases: applying the night's outcome at dawn,
//! exiling a participant after the day vote and the hunter's shot.

use crate::models::{
    game::Outcome,
    role::{DeathCause, Role},
    room::Room,
};

use super::victory;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightReport {
    pub killed: Option<String>,
    pub saved: Option<String>,
    pub poisoned: Option<String>,
}

impl NightReport {
    pub fn is_peaceful(&self) -> bool {
        self.killed.is_none() && self.poisoned.is_none()
    }
}

/// Applies tonight's kill, save and poison, and arms the hunter when the
/// hunter died by anything but poison.
pub fn settle_night(room: &mut Room) -> NightReport {
    let saved = room.witch.saved_player_id.clone();
    let mut killed = None;

    if saved.is_some() {
        room.last_killed = None;
    } else if let Some(victim) = room.last_killed.clone() {
        if room.kill_player(&victim) {
            killed = Some(victim);
        }
    }

    let poisoned = room.witch.poisoned_player_id.clone();
    if let Some(target) = &poisoned {
        room.kill_player(target);
    }

    let poisoned_hunter = poisoned
        .clone()
        .filter(|id| holds(room, id, Role::Hunter));
    let killed_hunter = killed.clone().filter(|id| holds(room, id, Role::Hunter));
    if let Some(hunter) = poisoned_hunter {
        room.hunter.arm(&hunter, DeathCause::Poison);
    } else if let Some(hunter) = killed_hunter {
        room.hunter.arm(&hunter, DeathCause::NightKill);
    }

    let report = NightReport {
        killed,
        saved,
        poisoned,
    };
    log_night(room, &report);
    report
}

fn holds(room: &Room, player_id: &str, role: Role) -> bool {
    room.get_player(player_id)
        .map(|p| p.has_role(role))
        .unwrap_or(false)
}

fn log_night(room: &mut Room, report: &NightReport) {
    if let Some(saved) = &report.saved {
        let name = room.display_name(saved);
        room.log.public(format!("💉 The witch saved {}", name));
    }
    if let Some(killed) = &report.killed {
        let name = room.display_name(killed);
        room.log.public(format!("🌙 {} was killed by the werewolves", name));
    }
    if let Some(poisoned) = &report.poisoned {
        let name = room.display_name(poisoned);
        room.log.public(format!("💊 {} was poisoned by the witch", name));
    }
    if report.is_peaceful() {
        room.log.public("🌅 A peaceful night, nobody died");
    }
}

pub fn dawn_message(room: &Room, report: &NightReport) -> String {
    let mut text = format!("☀️ Day {} dawns.\n\n", room.round);
    if report.is_peaceful() {
        text.push_str("Last night was peaceful. Nobody died.");
    } else {
        let mut dead: Vec<String> = Vec::new();
        if let Some(id) = &report.killed {
            dead.push(room.display_name(id));
        }
        if let Some(id) = &report.poisoned {
            if report.killed.as_ref() != Some(id) {
                dead.push(room.display_name(id));
            }
        }
        text.push_str(&format!("💀 Died last night: {}", dead.join(", ")));
    }
    text.push_str(&format!("\n\nAlive: {}", room.alive_summary()));
    text
}

/// Removes the day-vote loser. Returns true if the exiled participant gets a hunter's shot.
pub fn exile(room: &mut Room, player_id: &str) -> bool {
    room.kill_player(player_id);
    room.last_killed = Some(player_id.to_string());
    room.last_words_from_vote = true;
    if holds(room, player_id, Role::Hunter) {
        room.hunter.arm(player_id, DeathCause::Vote);
    }
    room.hunter.pending_shot_player_id.as_deref() == Some(player_id)
}

pub fn check_victory(room: &Room) -> Option<Outcome> {
    victory::evaluate(room.players.values())
}
