//! Interfaces to everything outside the game core: the chat transport,
//! moderation, automated participants and the post-game summary.
//!
//! All of these are best-effort. The core logs their failures and moves on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{
    event_log::EventLog,
    game::{GamePhase, PlayerView},
    role::{Faction, Role},
};

use super::agent::RandomAgent;

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("message delivery failed: {0}")]
    Delivery(String),
    #[error("moderation call failed: {0}")]
    Moderation(String),
    #[error("automated participant failed: {0}")]
    Agent(String),
    #[error("summary request failed: {0}")]
    Summary(String),
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_group(&self, room_id: &str, text: &str) -> Result<(), CollaboratorError>;

    async fn send_direct(
        &self,
        room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError>;

    async fn send_mention(
        &self,
        room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait Moderator: Send + Sync {
    async fn mute(
        &self,
        room_id: &str,
        player_id: &str,
        duration: Duration,
    ) -> Result<(), CollaboratorError>;

    async fn unmute(&self, room_id: &str, player_id: &str) -> Result<(), CollaboratorError>;

    async fn set_group_mute(&self, room_id: &str, enabled: bool) -> Result<(), CollaboratorError>;

    async fn grant_speaking_right(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError>;

    async fn revoke_speaking_right(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError>;

    async fn rename_to_seat(
        &self,
        room_id: &str,
        player_id: &str,
        seat: u32,
    ) -> Result<(), CollaboratorError>;

    async fn restore_name(
        &self,
        room_id: &str,
        player_id: &str,
        name: &str,
    ) -> Result<(), CollaboratorError>;
}

/// What an automated participant is told before it picks an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub room_id: String,
    pub player_id: String,
    pub role: Option<Role>,
    pub phase: GamePhase,
    pub round: u32,
    pub alive: Vec<PlayerView>,
    /// Ids the answer may name; empty when the phase wants speech.
    pub candidates: Vec<String>,
    pub recent_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentAction {
    Target(String),
    Speech(String),
    Abstain,
}

#[async_trait]
pub trait AgentPlayer: Send + Sync {
    async fn decide(&self, context: AgentContext) -> Result<AgentAction, CollaboratorError>;
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, log: &EventLog, winner: Faction)
        -> Result<String, CollaboratorError>;
}

/// Transport that drops everything. Used when no chat surface is attached.
#[derive(Debug, Default, Clone)]
pub struct Silent;

#[async_trait]
impl Messenger for Silent {
    async fn send_group(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn send_direct(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn send_mention(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[async_trait]
impl Moderator for Silent {
    async fn mute(&self, _: &str, _: &str, _: Duration) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn unmute(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn set_group_mute(&self, _: &str, _: bool) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn grant_speaking_right(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn revoke_speaking_right(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn rename_to_seat(&self, _: &str, _: &str, _: u32) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn restore_name(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[async_trait]
impl SummaryGenerator for Silent {
    async fn summarize(&self, _: &EventLog, _: Faction) -> Result<String, CollaboratorError> {
        Ok(String::new())
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub messenger: Arc<dyn Messenger>,
    pub moderator: Arc<dyn Moderator>,
    pub agents: Arc<dyn AgentPlayer>,
    pub summarizer: Arc<dyn SummaryGenerator>,
}

impl Collaborators {
    pub fn silent() -> Self {
        Self {
            messenger: Arc::new(Silent),
            moderator: Arc::new(Silent),
            agents: Arc::new(RandomAgent::seeded(0)),
            summarizer: Arc::new(Silent),
        }
    }

    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn Moderator>) -> Self {
        self.moderator = moderator;
        self
    }

    pub fn with_agents(mut self, agents: Arc<dyn AgentPlayer>) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn SummaryGenerator>) -> Self {
        self.summarizer = summarizer;
        self
    }
}
