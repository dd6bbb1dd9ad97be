use std::fmt;

use serde::{Deserialize, Serialize};

use super::{game::GamePhase, player::Player, room::Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Werewolf, // 人狼
    Seer,     // 占い師
    Witch,    // 魔女
    Hunter,   // 狩人
    Villager, // 村人
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Werewolves,
    Villagers,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Werewolves => write!(f, "Werewolves"),
            Faction::Villagers => write!(f, "Villagers"),
        }
    }
}

/// Commands a role may issue, each bound to the phase that accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCommand {
    NightKill,
    Conspire,
    Investigate,
    Save,
    Poison,
    Pass,
    Retaliate,
}

impl RoleCommand {
    pub fn usage(&self) -> &'static str {
        match self {
            RoleCommand::NightKill => "kill <seat>",
            RoleCommand::Conspire => "conspire <message>",
            RoleCommand::Investigate => "investigate <seat>",
            RoleCommand::Save => "save",
            RoleCommand::Poison => "poison <seat>",
            RoleCommand::Pass => "pass",
            RoleCommand::Retaliate => "shoot <seat>",
        }
    }

    pub fn phase(&self) -> GamePhase {
        match self {
            RoleCommand::NightKill | RoleCommand::Conspire => GamePhase::NightKill,
            RoleCommand::Investigate => GamePhase::NightInvestigation,
            RoleCommand::Save | RoleCommand::Poison | RoleCommand::Pass => {
                GamePhase::NightProtection
            }
            RoleCommand::Retaliate => GamePhase::Retaliation,
        }
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Werewolf,
        Role::Seer,
        Role::Witch,
        Role::Hunter,
        Role::Villager,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Werewolf => "Werewolf",
            Role::Seer => "Seer",
            Role::Witch => "Witch",
            Role::Hunter => "Hunter",
            Role::Villager => "Villager",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Role::Werewolf => "🐺",
            Role::Seer => "🔮",
            Role::Witch => "💊",
            Role::Hunter => "🔫",
            Role::Villager => "👤",
        }
    }

    pub fn faction(&self) -> Faction {
        match self {
            Role::Werewolf => Faction::Werewolves,
            _ => Faction::Villagers,
        }
    }

    /// Seer, witch and hunter: the roles whose loss ends the game for the village.
    pub fn is_special(&self) -> bool {
        matches!(self, Role::Seer | Role::Witch | Role::Hunter)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Werewolf => "Each night, agree with your pack on one player to kill.",
            Role::Seer => "Each night, learn whether one player is a werewolf.",
            Role::Witch => "Holds one antidote and one poison, each usable once per game.",
            Role::Hunter => "When killed (except by poison), may shoot one player.",
            Role::Villager => "An ordinary villager with no special ability.",
        }
    }

    pub fn goal(&self) -> &'static str {
        match self {
            Role::Werewolf => "Eliminate the village",
            Role::Seer => "Find the werewolves and help the village win",
            Role::Witch | Role::Hunter => "Help the village win",
            Role::Villager => "Find and exile every werewolf",
        }
    }

    pub fn commands(&self) -> &'static [RoleCommand] {
        match self {
            Role::Werewolf => &[RoleCommand::NightKill, RoleCommand::Conspire],
            Role::Seer => &[RoleCommand::Investigate],
            Role::Witch => &[RoleCommand::Save, RoleCommand::Poison, RoleCommand::Pass],
            Role::Hunter => &[RoleCommand::Retaliate],
            Role::Villager => &[],
        }
    }

    pub fn can_issue(&self, command: RoleCommand) -> bool {
        self.commands().contains(&command)
    }

    /// Private briefing sent to `player` when the game starts.
    pub fn briefing(&self, player: &Player, room: &Room) -> String {
        let mut text = format!(
            "🎭 The game has started! Your role is:\n\n{} {}\n\nGoal: {}!\n{}",
            self.emoji(),
            self.display_name(),
            self.goal(),
            self.description()
        );

        match self {
            Role::Werewolf => {
                let teammates: Vec<String> = room
                    .players_by_role(Role::Werewolf)
                    .into_iter()
                    .filter(|w| w.id != player.id)
                    .map(|w| w.display_name())
                    .collect();
                if !teammates.is_empty() {
                    text.push_str(&format!("\n\n🤝 Your pack: {}", teammates.join(", ")));
                }
                let targets: Vec<&Player> = room
                    .seated_players()
                    .into_iter()
                    .filter(|p| !p.is_werewolf())
                    .collect();
                text.push_str(&format!("\n\n📋 Possible targets:\n{}", format_player_list(&targets)));
            }
            Role::Seer | Role::Hunter => {
                let others: Vec<&Player> = room
                    .seated_players()
                    .into_iter()
                    .filter(|p| p.id != player.id)
                    .collect();
                text.push_str(&format!("\n\n📋 Players:\n{}", format_player_list(&others)));
            }
            Role::Witch => {
                text.push_str(
                    "\n\n• The antidote only saves tonight's werewolf victim\n\
                     • You cannot use both potions in the same night\n\
                     • You cannot poison yourself",
                );
            }
            Role::Villager => {}
        }

        let commands = self.commands();
        if !commands.is_empty() {
            let usage: Vec<&str> = commands.iter().map(|c| c.usage()).collect();
            text.push_str(&format!("\n\n💡 Commands: {}", usage.join(" | ")));
        }
        text
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

pub fn format_player_list(players: &[&Player]) -> String {
    players
        .iter()
        .map(|p| format!("  • {}", p.display_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Antidote and poison bookkeeping for the witch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WitchState {
    pub antidote_used: bool,
    pub poison_used: bool,
    pub saved_player_id: Option<String>,
    pub poisoned_player_id: Option<String>,
    pub has_acted: bool,
}

impl WitchState {
    pub fn reset_night(&mut self) {
        self.saved_player_id = None;
        self.poisoned_player_id = None;
        self.has_acted = false;
    }

    pub fn can_save(&self) -> bool {
        !self.antidote_used
    }

    pub fn can_poison(&self) -> bool {
        !self.poison_used
    }

    pub fn action_prompt(&self, killed: Option<&Player>) -> String {
        let killed_info = match killed {
            Some(p) => format!("Tonight's victim is {}.", p.display_name()),
            None => "Nobody was attacked tonight.".to_string(),
        };
        let status = |used: bool| if used { "used" } else { "available" };
        format!(
            "💊 Witch's turn\n\n{}\n\n💉 Antidote: {}\n💊 Poison: {}\n\nCommands: save | poison <seat> | pass",
            killed_info,
            status(self.antidote_used),
            status(self.poison_used)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    NightKill,
    Vote,
    Poison,
}

/// Pending post-death shot for the hunter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HunterState {
    pub pending_shot_player_id: Option<String>,
    pub death_cause: Option<DeathCause>,
    pub has_shot: bool,
}

impl HunterState {
    pub fn can_shoot(&self) -> bool {
        !self.has_shot && self.death_cause != Some(DeathCause::Poison)
    }

    pub fn arm(&mut self, hunter_id: &str, cause: DeathCause) {
        self.death_cause = Some(cause);
        if cause != DeathCause::Poison && !self.has_shot {
            self.pending_shot_player_id = Some(hunter_id.to_string());
        }
    }

    /// Consumes the shot and returns the cause it was armed with.
    pub fn consume(&mut self) -> Option<DeathCause> {
        self.has_shot = true;
        self.pending_shot_player_id = None;
        self.death_cause
    }

    pub fn death_prompt(cause: DeathCause, timeout_secs: u64) -> Option<String> {
        let reason = match cause {
            DeathCause::NightKill => "You were killed by the werewolves!",
            DeathCause::Vote => "You were exiled by the village!",
            DeathCause::Poison => return None,
        };
        Some(format!(
            "💀 {}\n\n🔫 You may shoot one player.\nCommand: shoot <seat>\n\n⏰ {} seconds",
            reason, timeout_secs
        ))
    }
}
