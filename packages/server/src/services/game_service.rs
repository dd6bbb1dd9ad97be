use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GameError, GameResult};
use crate::models::{
    config::GameConfig,
    game::{GamePhase, Outcome, PlayerAction, RoomSnapshot},
    player::Player,
    role::Role,
    room::Room,
};
use crate::phases::{self, GameContext, TimerPlan, Transition};

use super::collaborators::Collaborators;
use super::timer::{sleep_unless_cancelled, TimerEvent, TimerTicket};

type Session = Arc<Mutex<Room>>;

/// Owns every running room and drives phase transitions.
///
/// Lock order: the room map is only ever held long enough to clone a
/// session handle, except in teardown where the room lock is already held.
pub struct GameManager {
    rooms: Mutex<HashMap<String, Session>>,
    outcomes: Mutex<HashMap<String, Outcome>>,
    defaults: GameConfig,
    ctx: GameContext,
}

impl GameManager {
    pub fn new(defaults: GameConfig, collaborators: Collaborators, seed: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
            defaults,
            ctx: GameContext::new(collaborators, seed),
        })
    }

    pub fn default_config(&self) -> &GameConfig {
        &self.defaults
    }

    async fn session(&self, room_id: &str) -> GameResult<Session> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
    }

    async fn sessions(&self) -> Vec<Session> {
        self.rooms.lock().await.values().cloned().collect()
    }

    pub async fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.lock().await.contains_key(room_id)
    }

    pub async fn room_ids(&self) -> Vec<String> {
        self.rooms.lock().await.keys().cloned().collect()
    }

    pub async fn create_room(
        &self,
        room_id: &str,
        creator_id: &str,
        config: Option<GameConfig>,
    ) -> GameResult<RoomSnapshot> {
        let config = config.unwrap_or_else(|| self.defaults.clone());
        config.validate()?;

        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(room_id) {
            return Err(GameError::RoomExists(room_id.to_string()));
        }
        let room = Room::new(room_id, creator_id, config);
        let snapshot = room.snapshot();
        rooms.insert(room_id.to_string(), Arc::new(Mutex::new(room)));
        info!(room_id, creator = creator_id, "room created");
        Ok(snapshot)
    }

    pub async fn join_room(&self, room_id: &str, player: Player) -> GameResult<RoomSnapshot> {
        if let Some(other) = self.find_room_by_player(&player.id).await {
            if other != room_id {
                return Err(GameError::InAnotherRoom(player.id, other));
            }
        }
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        let player_id = player.id.clone();
        let name = player.name.clone();
        room.add_player(player)?;
        info!(room_id, participant = %player_id, count = room.player_count(), "participant joined");

        let text = format!(
            "✅ {} joined ({}/{})",
            name,
            room.player_count(),
            room.config.total_players
        );
        self.ctx.announce(room_id, &text).await;
        Ok(room.snapshot())
    }

    /// Removes a participant before the game starts. Only the creator may eject others.
    pub async fn eject(&self, room_id: &str, requester: &str, player_id: &str) -> GameResult<()> {
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        if requester != player_id && !room.is_creator(requester) {
            return Err(GameError::NotCreator);
        }
        let player = room.remove_player(player_id)?;
        info!(room_id, participant = player_id, "participant left");
        self.ctx
            .announce(room_id, &format!("👋 {} left the room", player.name))
            .await;
        Ok(())
    }

    pub async fn start_game(self: &Arc<Self>, room_id: &str, requester: &str) -> GameResult<()> {
        let roles = {
            let session = self.session(room_id).await?;
            let room = session.lock().await;
            self.ctx.shuffled_roles(&room.config)
        };
        self.start_game_with_roles(room_id, requester, roles).await
    }

    /// Starts the game with roles handed out in seat order.
    pub async fn start_game_with_roles(
        self: &Arc<Self>,
        room_id: &str,
        requester: &str,
        roles: Vec<Role>,
    ) -> GameResult<()> {
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        if !room.is_creator(requester) {
            return Err(GameError::NotCreator);
        }
        if room.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        room.config.validate()?;
        if room.player_count() < room.config.total_players {
            return Err(GameError::NotEnoughPlayers {
                needed: room.config.total_players,
                actual: room.player_count(),
            });
        }
        room.assign_seats_and_roles(roles)?;
        info!(room_id, players = room.player_count(), "game starting");

        let seats: Vec<(String, u32)> = room
            .seated_players()
            .iter()
            .map(|p| (p.id.clone(), p.seat))
            .collect();
        for (id, seat) in &seats {
            self.ctx.rename_to_seat(room_id, id, *seat).await;
        }

        let briefings: Vec<(String, String)> = room
            .seated_players()
            .into_iter()
            .filter_map(|p| p.role.map(|role| (p.id.clone(), role.briefing(p, &room))))
            .collect();
        let roster = room
            .seated_players()
            .iter()
            .map(|p| format!("  {}", p.display_name()))
            .collect::<Vec<_>>()
            .join("\n");
        self.ctx
            .announce(
                room_id,
                &format!(
                    "🎮 The game begins!\n\n{}\n\n📋 Seats:\n{}",
                    room.config.describe(),
                    roster
                ),
            )
            .await;
        for (id, text) in &briefings {
            self.ctx.tell(room_id, id, text).await;
        }

        self.drive(&mut room, Transition::Enter(GamePhase::NightKill))
            .await;
        Ok(())
    }

    pub async fn submit(
        self: &Arc<Self>,
        room_id: &str,
        actor: &str,
        action: PlayerAction,
    ) -> GameResult<()> {
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        let transition = phases::handle_action(&mut room, &self.ctx, actor, action).await?;
        self.drive(&mut room, transition).await;
        Ok(())
    }

    /// Turns a seat number or participant id into a participant id.
    pub async fn resolve_target(&self, room_id: &str, selector: &str) -> GameResult<String> {
        let session = self.session(room_id).await?;
        let room = session.lock().await;
        room.resolve_target(selector)
    }

    /// Feeds a chat line into the speech buffer. Returns whether it was kept.
    pub async fn capture_speech(&self, room_id: &str, actor: &str, text: &str) -> GameResult<bool> {
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        Ok(phases::capture_speech(&mut room, actor, text))
    }

    pub async fn snapshot(&self, room_id: &str) -> GameResult<RoomSnapshot> {
        let session = self.session(room_id).await?;
        let room = session.lock().await;
        Ok(room.snapshot())
    }

    /// Full copy of the room, timer excluded.
    pub async fn room_state(&self, room_id: &str) -> GameResult<Room> {
        let session = self.session(room_id).await?;
        let room = session.lock().await;
        Ok(room.clone())
    }

    pub async fn list_rooms(&self) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::new();
        for session in self.sessions().await {
            snapshots.push(session.lock().await.snapshot());
        }
        snapshots.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        snapshots
    }

    pub async fn outcome(&self, room_id: &str) -> Option<Outcome> {
        self.outcomes.lock().await.get(room_id).cloned()
    }

    pub async fn find_room_by_player(&self, player_id: &str) -> Option<String> {
        for session in self.sessions().await {
            let room = session.lock().await;
            if room.players.contains_key(player_id) {
                return Some(room.room_id.clone());
            }
        }
        None
    }

    /// Explicit teardown by the creator.
    pub async fn end_room(&self, room_id: &str, requester: &str) -> GameResult<()> {
        let session = self.session(room_id).await?;
        let mut room = session.lock().await;
        if !room.is_creator(requester) {
            return Err(GameError::NotCreator);
        }
        self.ctx
            .announce(room_id, "🛑 The host ended the game.")
            .await;
        self.teardown(&mut room).await;
        Ok(())
    }

    pub async fn shutdown(&self) {
        for session in self.sessions().await {
            let mut room = session.lock().await;
            self.teardown(&mut room).await;
        }
    }

    /// Applies transitions until the room settles on a timer or the game ends,
    /// letting automated participants act whenever the room settles.
    async fn drive(self: &Arc<Self>, room: &mut Room, mut transition: Transition) {
        let mut asked: BTreeSet<(u64, String)> = BTreeSet::new();
        loop {
            match transition {
                Transition::Stay => {}
                Transition::Enter(phase) => {
                    room.timer.cancel();
                    transition = phases::enter(room, &self.ctx, phase).await;
                    continue;
                }
                Transition::Wait(plan) => self.schedule(room, plan),
                Transition::GameOver(outcome) => {
                    self.finish(room, outcome).await;
                    return;
                }
            }

            match self.next_agent_action(room, &mut asked).await {
                Some((actor, action)) => {
                    transition = match phases::handle_action(room, &self.ctx, &actor, action).await {
                        Ok(next) => next,
                        Err(e) => {
                            warn!(room_id = %room.room_id, participant = %actor, error = %e, "automated action rejected");
                            Transition::Stay
                        }
                    };
                }
                None => return,
            }
        }
    }

    async fn next_agent_action(
        &self,
        room: &mut Room,
        asked: &mut BTreeSet<(u64, String)>,
    ) -> Option<(String, PlayerAction)> {
        let generation = room.timer.generation();
        for actor in phases::awaiting_agents(room) {
            if !asked.insert((generation, actor.clone())) {
                continue;
            }
            let context = phases::agent_context(room, &actor);
            let answer = self.ctx.ask_agent(context).await;
            if let Some(action) = phases::agent_action(room, &actor, answer) {
                return Some((actor, action));
            }
        }
        None
    }

    fn schedule(self: &Arc<Self>, room: &mut Room, plan: TimerPlan) {
        let (ticket, token) = room.timer.arm(room.phase);
        debug!(
            room_id = %room.room_id,
            phase = %room.phase,
            generation = ticket.generation,
            secs = plan.duration.as_secs_f64(),
            "timer armed"
        );
        tokio::spawn(Arc::clone(self).run_timer(room.room_id.clone(), ticket, token, plan));
    }

    async fn run_timer(
        self: Arc<Self>,
        room_id: String,
        ticket: TimerTicket,
        token: CancellationToken,
        plan: TimerPlan,
    ) {
        let mut remaining = plan.duration;
        if let Some(lead) = plan.reminder {
            if !sleep_unless_cancelled(&token, plan.duration - lead).await {
                return;
            }
            self.fire(&room_id, ticket, TimerEvent::Reminder).await;
            remaining = lead;
        }
        if sleep_unless_cancelled(&token, remaining).await {
            self.fire(&room_id, ticket, TimerEvent::Deadline).await;
        }
    }

    async fn fire(self: &Arc<Self>, room_id: &str, ticket: TimerTicket, event: TimerEvent) {
        let session = match self.rooms.lock().await.get(room_id).cloned() {
            Some(session) => session,
            None => {
                debug!(room_id, "timer fired for a room that no longer exists");
                return;
            }
        };
        let mut room = session.lock().await;
        if !room.timer.is_current(&ticket) || room.phase != ticket.phase {
            debug!(room_id, phase = %room.phase, generation = ticket.generation, "stale timer ignored");
            return;
        }

        let transition = match event {
            TimerEvent::Reminder => phases::remind(&mut room, &self.ctx).await,
            TimerEvent::Deadline => {
                room.timer.cancel();
                phases::timeout(&mut room, &self.ctx).await
            }
        };
        self.drive(&mut room, transition).await;
    }

    async fn finish(&self, room: &mut Room, outcome: Outcome) {
        room.timer.cancel();
        room.phase = GamePhase::Finished;
        info!(room_id = %room.room_id, winner = %outcome.winner, reason = ?outcome.reason, "game over");

        let reveal = room.role_reveal();
        room.log.separator();
        room.log.public(outcome.message());
        room.log.public(format!("📜 Roles:\n{}", reveal));
        self.ctx
            .announce(
                &room.room_id,
                &format!("🎉 Game over!\n\n{}\n\n📜 Roles:\n{}", outcome.message(), reveal),
            )
            .await;

        if room.config.enable_summary {
            let review = self
                .ctx
                .summarize(&room.room_id, &room.log, outcome.winner)
                .await;
            if !review.is_empty() {
                self.ctx.announce(&room.room_id, &review).await;
            }
        }

        self.outcomes
            .lock()
            .await
            .insert(room.room_id.clone(), outcome);
        self.teardown(room).await;
    }

    /// Undoes every moderation side effect and drops the session.
    async fn teardown(&self, room: &mut Room) {
        room.timer.cancel();
        let room_id = room.room_id.clone();

        let renamed: Vec<(String, String)> = room
            .seated_players()
            .iter()
            .filter(|p| p.seat > 0)
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        for (id, name) in &renamed {
            self.ctx.restore_name(&room_id, id, name).await;
        }
        for id in room.muted.clone() {
            self.ctx.unmute(room, &id).await;
        }
        if room.group_muted {
            self.ctx.group_mute(room, false).await;
        }
        for id in room.speaking_rights.clone() {
            self.ctx.revoke_speaking(room, &id).await;
        }

        self.rooms.lock().await.remove(&room_id);
        info!(room_id = %room_id, "room cleaned up");
    }
}
