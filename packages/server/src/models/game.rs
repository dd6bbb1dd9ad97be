use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::role::{Faction, RoleCommand};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,            // ゲーム開始前
    NightKill,          // 人狼の襲撃投票
    NightInvestigation, // 占い
    NightProtection,    // 魔女の薬
    LastWords,          // 遺言
    DaySpeaking,        // 昼の発言
    DayVoting,          // 昼の投票
    PkSpeaking,         // 決選発言
    PkVoting,           // 決選投票
    Retaliation,        // 狩人の反撃
    Finished,           // ゲーム終了
}

impl GamePhase {
    pub fn is_night(&self) -> bool {
        matches!(
            self,
            GamePhase::NightKill | GamePhase::NightInvestigation | GamePhase::NightProtection
        )
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, GamePhase::DaySpeaking | GamePhase::PkSpeaking)
    }

    pub fn is_voting(&self) -> bool {
        matches!(self, GamePhase::DayVoting | GamePhase::PkVoting)
    }

    pub fn label(&self) -> &'static str {
        match self {
            GamePhase::Waiting => "waiting",
            GamePhase::NightKill => "werewolf kill",
            GamePhase::NightInvestigation => "seer investigation",
            GamePhase::NightProtection => "witch",
            GamePhase::LastWords => "last words",
            GamePhase::DaySpeaking => "day speaking",
            GamePhase::DayVoting => "day vote",
            GamePhase::PkSpeaking => "runoff speaking",
            GamePhase::PkVoting => "runoff vote",
            GamePhase::Retaliation => "hunter's shot",
            GamePhase::Finished => "finished",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Werewolf ballots for the current night, voter -> target.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NightVoteState {
    pub votes: BTreeMap<String, String>,
}

impl NightVoteState {
    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DayVoteState {
    pub votes: BTreeMap<String, String>,
    /// Tied participants under runoff, in seat order.
    pub pk_players: Vec<String>,
    pub is_runoff: bool,
}

impl DayVoteState {
    pub fn clear(&mut self) {
        self.votes.clear();
        self.pk_players.clear();
        self.is_runoff = false;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SpeakingState {
    pub order: Vec<String>,
    pub current_index: usize,
    pub current_speaker_id: Option<String>,
    pub current_speech: Vec<String>,
}

impl SpeakingState {
    pub fn reset(&mut self, order: Vec<String>) {
        self.order = order;
        self.current_index = 0;
        self.current_speaker_id = None;
        self.current_speech.clear();
    }

    /// Joined speech buffer cut to `limit` characters, `None` if nothing was captured.
    pub fn transcript(&self, limit: usize) -> Option<String> {
        if self.current_speech.is_empty() {
            return None;
        }
        let full = self.current_speech.join(" ");
        if full.chars().count() > limit {
            let cut: String = full.chars().take(limit).collect();
            Some(format!("{}...", cut))
        } else {
            Some(full)
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VictoryReason {
    AllWerewolvesEliminated,
    WerewolvesReachParity,
    SpecialRolesEliminated,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Faction,
    pub reason: VictoryReason,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self.reason {
            VictoryReason::AllWerewolvesEliminated => {
                "The village wins! Every werewolf has been eliminated!"
            }
            VictoryReason::WerewolvesReachParity => {
                "The werewolves win! The village no longer outnumbers them!"
            }
            VictoryReason::SpecialRolesEliminated => {
                "The werewolves win! Every special role has fallen!"
            }
        }
    }
}

/// An inbound action, already resolved to concrete participant ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerAction {
    NightKill { target: String },
    Conspire { message: String },
    Investigate { target: String },
    Save,
    Poison { target: String },
    Pass,
    Retaliate { target: String },
    FinishSpeaking,
    FinishLastWords,
    StartVote,
    Vote { target: String },
}

impl PlayerAction {
    pub fn target(&self) -> Option<&str> {
        match self {
            PlayerAction::NightKill { target }
            | PlayerAction::Investigate { target }
            | PlayerAction::Poison { target }
            | PlayerAction::Retaliate { target }
            | PlayerAction::Vote { target } => Some(target),
            _ => None,
        }
    }

    pub fn target_mut(&mut self) -> Option<&mut String> {
        match self {
            PlayerAction::NightKill { target }
            | PlayerAction::Investigate { target }
            | PlayerAction::Poison { target }
            | PlayerAction::Retaliate { target }
            | PlayerAction::Vote { target } => Some(target),
            _ => None,
        }
    }

    /// The role command this action needs, `None` for actions open to everyone.
    pub fn role_command(&self) -> Option<RoleCommand> {
        match self {
            PlayerAction::NightKill { .. } => Some(RoleCommand::NightKill),
            PlayerAction::Conspire { .. } => Some(RoleCommand::Conspire),
            PlayerAction::Investigate { .. } => Some(RoleCommand::Investigate),
            PlayerAction::Save => Some(RoleCommand::Save),
            PlayerAction::Poison { .. } => Some(RoleCommand::Poison),
            PlayerAction::Pass => Some(RoleCommand::Pass),
            PlayerAction::Retaliate { .. } => Some(RoleCommand::Retaliate),
            PlayerAction::FinishSpeaking
            | PlayerAction::FinishLastWords
            | PlayerAction::StartVote
            | PlayerAction::Vote { .. } => None,
        }
    }
}

/// What clients may see about a room while a game runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub creator_id: String,
    pub phase: GamePhase,
    pub round: u32,
    pub player_count: usize,
    pub alive_count: usize,
    pub max_players: usize,
    pub players: Vec<PlayerView>,
    pub current_speaker: Option<String>,
    pub pk_players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub seat: u32,
    pub alive: bool,
    pub automated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_truncates_to_limit() {
        let mut speaking = SpeakingState::default();
        assert_eq!(speaking.transcript(200), None);
        speaking.current_speech = vec!["a".repeat(150), "b".repeat(100)];
        let text = speaking.transcript(200).unwrap();
        assert_eq!(text.chars().count(), 203);
        assert!(text.ends_with("b..."));
    }

    #[test]
    fn action_json_uses_kind_tag() {
        let action: PlayerAction =
            serde_json::from_str(r#"{"kind":"vote","target":"p3"}"#).unwrap();
        assert_eq!(action, PlayerAction::Vote { target: "p3".into() });
        assert_eq!(action.target(), Some("p3"));
        let pass: PlayerAction = serde_json::from_str(r#"{"kind":"pass"}"#).unwrap();
        assert_eq!(pass, PlayerAction::Pass);
    }

    #[test]
    fn role_commands_follow_the_action() {
        assert_eq!(
            PlayerAction::Poison { target: "p1".into() }.role_command(),
            Some(RoleCommand::Poison)
        );
        assert_eq!(PlayerAction::Pass.role_command(), Some(RoleCommand::Pass));
        assert_eq!(PlayerAction::StartVote.role_command(), None);
        assert_eq!(PlayerAction::Vote { target: "p1".into() }.role_command(), None);
    }
}
