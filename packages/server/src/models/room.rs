use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::{
    config::GameConfig,
    event_log::EventLog,
    game::{DayVoteState, GamePhase, NightVoteState, PlayerView, RoomSnapshot, SpeakingState},
    player::Player,
    role::{HunterState, Role, WitchState},
};
use crate::error::{GameError, GameResult};
use crate::services::timer::PhaseTimer;

/// All mutable state of one game. Every mutation goes through a method here
/// or through a phase controller holding the room lock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub creator_id: String,
    pub config: GameConfig,
    pub players: HashMap<String, Player>,
    /// Participant ids in join order; seats are handed out in this order.
    pub join_order: Vec<String>,
    pub seats: BTreeMap<u32, String>,
    pub phase: GamePhase,
    pub round: u32,
    pub is_first_round: bool,
    /// Tonight's werewolf victim, cleared once resolved.
    pub last_killed: Option<String>,
    pub last_words_from_vote: bool,
    pub seer_checked: bool,
    pub night_votes: NightVoteState,
    pub day_votes: DayVoteState,
    pub speaking: SpeakingState,
    pub witch: WitchState,
    pub hunter: HunterState,
    // モデレーションの後片付け用
    pub muted: BTreeSet<String>,
    pub speaking_rights: BTreeSet<String>,
    pub group_muted: bool,
    pub log: EventLog,
    #[serde(skip)]
    pub timer: PhaseTimer,
}

impl Room {
    pub fn new(room_id: impl Into<String>, creator_id: impl Into<String>, config: GameConfig) -> Self {
        Room {
            room_id: room_id.into(),
            creator_id: creator_id.into(),
            config,
            players: HashMap::new(),
            join_order: Vec::new(),
            seats: BTreeMap::new(),
            phase: GamePhase::Waiting,
            round: 0,
            is_first_round: true,
            last_killed: None,
            last_words_from_vote: false,
            seer_checked: false,
            night_votes: NightVoteState::default(),
            day_votes: DayVoteState::default(),
            speaking: SpeakingState::default(),
            witch: WitchState::default(),
            hunter: HunterState::default(),
            muted: BTreeSet::new(),
            speaking_rights: BTreeSet::new(),
            group_muted: false,
            log: EventLog::new(),
            timer: PhaseTimer::default(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.phase != GamePhase::Waiting
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.total_players
    }

    pub fn is_creator(&self, player_id: &str) -> bool {
        self.creator_id == player_id
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn add_player(&mut self, player: Player) -> GameResult<()> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.contains_key(&player.id) {
            return Err(GameError::AlreadyJoined(player.id));
        }
        if self.is_full() {
            return Err(GameError::RoomFull(self.config.total_players));
        }
        self.join_order.push(player.id.clone());
        self.players.insert(player.id.clone(), player);
        Ok(())
    }

    pub fn remove_player(&mut self, player_id: &str) -> GameResult<Player> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        let player = self
            .players
            .remove(player_id)
            .ok_or_else(|| GameError::NotInRoom(player_id.to_string()))?;
        self.join_order.retain(|id| id != player_id);
        Ok(player)
    }

    pub fn get_player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn require_player(&self, player_id: &str) -> GameResult<&Player> {
        self.players
            .get(player_id)
            .ok_or_else(|| GameError::NotInRoom(player_id.to_string()))
    }

    pub fn player_by_seat(&self, seat: u32) -> Option<&Player> {
        self.seats.get(&seat).and_then(|id| self.players.get(id))
    }

    pub fn display_name(&self, player_id: &str) -> String {
        self.players
            .get(player_id)
            .map(|p| p.display_name())
            .unwrap_or_else(|| player_id.to_string())
    }

    /// Every participant in seat order (join order before the game starts).
    pub fn seated_players(&self) -> Vec<&Player> {
        if self.seats.is_empty() {
            self.join_order
                .iter()
                .filter_map(|id| self.players.get(id))
                .collect()
        } else {
            self.seats
                .values()
                .filter_map(|id| self.players.get(id))
                .collect()
        }
    }

    pub fn alive_players(&self) -> Vec<&Player> {
        self.seated_players()
            .into_iter()
            .filter(|p| p.is_alive())
            .collect()
    }

    pub fn alive_ids(&self) -> Vec<String> {
        self.alive_players().into_iter().map(|p| p.id.clone()).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    pub fn players_by_role(&self, role: Role) -> Vec<&Player> {
        self.seated_players()
            .into_iter()
            .filter(|p| p.has_role(role))
            .collect()
    }

    pub fn alive_werewolves(&self) -> Vec<&Player> {
        self.players_by_role(Role::Werewolf)
            .into_iter()
            .filter(|p| p.is_alive())
            .collect()
    }

    /// First holder of `role` in seat order, alive or not.
    pub fn role_holder(&self, role: Role) -> Option<&Player> {
        self.players_by_role(role).into_iter().next()
    }

    pub fn is_alive(&self, player_id: &str) -> bool {
        self.players
            .get(player_id)
            .map(|p| p.is_alive())
            .unwrap_or(false)
    }

    /// Marks the participant dead. Returns false if unknown or already dead.
    pub fn kill_player(&mut self, player_id: &str) -> bool {
        match self.players.get_mut(player_id) {
            Some(player) if player.is_alive() => {
                player.kill();
                true
            }
            _ => false,
        }
    }

    /// Seats everyone 1..N in join order and hands out `roles` in seat order.
    pub fn assign_seats_and_roles(&mut self, roles: Vec<Role>) -> GameResult<()> {
        if roles.len() != self.join_order.len() {
            return Err(GameError::RoleListMismatch {
                expected: self.join_order.len(),
                actual: roles.len(),
            });
        }
        self.seats.clear();
        for (index, (id, role)) in self.join_order.iter().zip(roles).enumerate() {
            let seat = index as u32 + 1;
            if let Some(player) = self.players.get_mut(id) {
                player.assign_seat(seat);
                player.assign_role(role);
            }
            self.seats.insert(seat, id.clone());
        }
        Ok(())
    }

    /// Accepts a seat number or a participant id.
    pub fn resolve_target(&self, selector: &str) -> GameResult<String> {
        let selector = selector.trim();
        if let Ok(seat) = selector.parse::<u32>() {
            if let Some(id) = self.seats.get(&seat) {
                return Ok(id.clone());
            }
        }
        if self.players.contains_key(selector) {
            return Ok(selector.to_string());
        }
        Err(GameError::UnknownTarget(selector.to_string()))
    }

    pub fn start_new_night(&mut self) {
        if self.round > 0 {
            self.is_first_round = false;
        }
        self.round += 1;
        self.last_killed = None;
        self.seer_checked = false;
        self.night_votes.clear();
        self.witch.reset_night();
        self.log.separator();
        self.log.public(format!("Night {}", self.round));
    }

    pub fn end_first_round(&mut self) {
        self.is_first_round = false;
    }

    pub fn alive_summary(&self) -> String {
        format!("{}/{}", self.alive_count(), self.player_count())
    }

    /// Every participant grouped by role, for the final announcement.
    pub fn role_reveal(&self) -> String {
        Role::ALL
            .iter()
            .filter_map(|role| {
                let holders = self.players_by_role(*role);
                if holders.is_empty() {
                    return None;
                }
                let names: Vec<String> = holders
                    .iter()
                    .map(|p| {
                        let mark = if p.is_alive() { "" } else { " 💀" };
                        format!("{}{}", p.display_name(), mark)
                    })
                    .collect();
                Some(format!("{} {}: {}", role.emoji(), role, names.join(", ")))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            creator_id: self.creator_id.clone(),
            phase: self.phase,
            round: self.round,
            player_count: self.player_count(),
            alive_count: self.alive_count(),
            max_players: self.config.total_players,
            players: self
                .seated_players()
                .into_iter()
                .map(|p| PlayerView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    seat: p.seat,
                    alive: p.is_alive(),
                    automated: p.automated,
                })
                .collect(),
            current_speaker: self.speaking.current_speaker_id.clone(),
            pk_players: self.day_votes.pk_players.clone(),
        }
    }
}
