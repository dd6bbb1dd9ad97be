use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::models::{config::GameConfig, event_log::EventLog, role::Faction, role::Role, room::Room};
use crate::services::collaborators::{AgentAction, AgentContext, Collaborators};

/// Shared, stateless services the phase controllers act through.
///
/// Every collaborator call is best-effort: a failure is logged and the
/// game carries on as if it had succeeded.
pub struct GameContext {
    collaborators: Collaborators,
    rng: Mutex<StdRng>,
}

impl GameContext {
    pub fn new(collaborators: Collaborators, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            collaborators,
            rng: Mutex::new(rng),
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Runs `f` with the shared rng. Never hold the result across an await.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Short randomized wait used when a queried role is already dead.
    pub fn dead_wait(&self, config: &GameConfig) -> Duration {
        let min = config.timeout_dead_min as f64;
        let max = config.timeout_dead_max.max(config.timeout_dead_min) as f64;
        let secs = self.with_rng(|rng| rng.gen_range(min..=max));
        Duration::from_secs_f64(secs)
    }

    pub fn shuffled_roles(&self, config: &GameConfig) -> Vec<Role> {
        let mut roles = config.roles_pool();
        self.with_rng(|rng| roles.shuffle(rng));
        roles
    }

    pub async fn announce(&self, room_id: &str, text: &str) {
        if let Err(e) = self.collaborators.messenger.send_group(room_id, text).await {
            warn!(room_id, error = %e, "group message failed");
        }
    }

    pub async fn tell(&self, room_id: &str, player_id: &str, text: &str) {
        if let Err(e) = self
            .collaborators
            .messenger
            .send_direct(room_id, player_id, text)
            .await
        {
            warn!(room_id, participant = player_id, error = %e, "direct message failed");
        }
    }

    pub async fn mention(&self, room_id: &str, player_id: &str, text: &str) {
        if let Err(e) = self
            .collaborators
            .messenger
            .send_mention(room_id, player_id, text)
            .await
        {
            warn!(room_id, participant = player_id, error = %e, "mention failed");
        }
    }

    pub async fn mute(&self, room: &mut Room, player_id: &str) {
        let duration = room.config.ban_duration();
        room.muted.insert(player_id.to_string());
        if let Err(e) = self
            .collaborators
            .moderator
            .mute(&room.room_id, player_id, duration)
            .await
        {
            warn!(room_id = %room.room_id, participant = player_id, error = %e, "mute failed");
        }
    }

    pub async fn unmute(&self, room: &mut Room, player_id: &str) {
        room.muted.remove(player_id);
        if let Err(e) = self
            .collaborators
            .moderator
            .unmute(&room.room_id, player_id)
            .await
        {
            warn!(room_id = %room.room_id, participant = player_id, error = %e, "unmute failed");
        }
    }

    pub async fn group_mute(&self, room: &mut Room, enabled: bool) {
        room.group_muted = enabled;
        if let Err(e) = self
            .collaborators
            .moderator
            .set_group_mute(&room.room_id, enabled)
            .await
        {
            warn!(room_id = %room.room_id, enabled, error = %e, "group mute failed");
        }
    }

    pub async fn grant_speaking(&self, room: &mut Room, player_id: &str) {
        room.speaking_rights.insert(player_id.to_string());
        if let Err(e) = self
            .collaborators
            .moderator
            .grant_speaking_right(&room.room_id, player_id)
            .await
        {
            warn!(room_id = %room.room_id, participant = player_id, error = %e, "grant speaking right failed");
        }
    }

    pub async fn revoke_speaking(&self, room: &mut Room, player_id: &str) {
        room.speaking_rights.remove(player_id);
        if let Err(e) = self
            .collaborators
            .moderator
            .revoke_speaking_right(&room.room_id, player_id)
            .await
        {
            warn!(room_id = %room.room_id, participant = player_id, error = %e, "revoke speaking right failed");
        }
    }

    pub async fn rename_to_seat(&self, room_id: &str, player_id: &str, seat: u32) {
        if let Err(e) = self
            .collaborators
            .moderator
            .rename_to_seat(room_id, player_id, seat)
            .await
        {
            warn!(room_id, participant = player_id, error = %e, "rename failed");
        }
    }

    pub async fn restore_name(&self, room_id: &str, player_id: &str, name: &str) {
        if let Err(e) = self
            .collaborators
            .moderator
            .restore_name(room_id, player_id, name)
            .await
        {
            warn!(room_id, participant = player_id, error = %e, "restore name failed");
        }
    }

    /// `None` when the agent failed; callers substitute their default.
    pub async fn ask_agent(&self, context: AgentContext) -> Option<AgentAction> {
        let room_id = context.room_id.clone();
        let player_id = context.player_id.clone();
        match self.collaborators.agents.decide(context).await {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(room_id = %room_id, participant = %player_id, error = %e, "automated participant failed, using default");
                None
            }
        }
    }

    /// Empty string on failure.
    pub async fn summarize(&self, room_id: &str, log: &EventLog, winner: Faction) -> String {
        match self.collaborators.summarizer.summarize(log, winner).await {
            Ok(text) => text,
            Err(e) => {
                warn!(room_id, error = %e, "summary generation failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_wait_stays_inside_the_window() {
        let ctx = GameContext::new(Collaborators::silent(), Some(11));
        let config = GameConfig::default();
        for _ in 0..50 {
            let wait = ctx.dead_wait(&config);
            assert!(wait >= Duration::from_secs(10));
            assert!(wait <= Duration::from_secs(15));
        }
    }

    #[test]
    fn seeded_shuffles_repeat() {
        let config = GameConfig::default();
        let a = GameContext::new(Collaborators::silent(), Some(5)).shuffled_roles(&config);
        let b = GameContext::new(Collaborators::silent(), Some(5)).shuffled_roles(&config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 9);
    }
}
