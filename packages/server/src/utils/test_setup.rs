//! Shared fixtures for unit and integration tests.

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use dotenvy::dotenv;

use crate::models::{
    config::GameConfig, event_log::EventLog, player::Player, role::Faction, role::Role,
};
use crate::services::{
    channels::ModerationAction,
    collaborators::{
        AgentAction, AgentContext, AgentPlayer, CollaboratorError, Collaborators, Messenger,
        Moderator, SummaryGenerator,
    },
    game_service::GameManager,
};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Group(String),
    Direct { to: String, text: String },
    Mention { to: String, text: String },
}

/// Messenger that keeps everything it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingMessenger {
    fn record(&self, sent: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sent);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn group_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Group(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn direct_to(&self, player_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Direct { to, text } if to == player_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn group_contains(&self, needle: &str) -> bool {
        self.group_texts().iter().any(|t| t.contains(needle))
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_group(&self, _room_id: &str, text: &str) -> Result<(), CollaboratorError> {
        self.record(Sent::Group(text.to_string()));
        Ok(())
    }

    async fn send_direct(
        &self,
        _room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(Sent::Direct {
            to: player_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_mention(
        &self,
        _room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(Sent::Mention {
            to: player_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Moderator that keeps every call as `(participant, action)`.
#[derive(Debug, Default)]
pub struct RecordingModerator {
    calls: Mutex<Vec<(Option<String>, ModerationAction)>>,
}

impl RecordingModerator {
    fn record(&self, player_id: Option<&str>, action: ModerationAction) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((player_id.map(str::to_string), action));
    }

    pub fn calls(&self) -> Vec<(Option<String>, ModerationAction)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calls_for(&self, player_id: &str) -> Vec<ModerationAction> {
        self.calls()
            .into_iter()
            .filter(|(id, _)| id.as_deref() == Some(player_id))
            .map(|(_, action)| action)
            .collect()
    }
}

#[async_trait]
impl Moderator for RecordingModerator {
    async fn mute(
        &self,
        _room_id: &str,
        player_id: &str,
        duration: Duration,
    ) -> Result<(), CollaboratorError> {
        self.record(
            Some(player_id),
            ModerationAction::Mute {
                seconds: duration.as_secs(),
            },
        );
        Ok(())
    }

    async fn unmute(&self, _room_id: &str, player_id: &str) -> Result<(), CollaboratorError> {
        self.record(Some(player_id), ModerationAction::Unmute);
        Ok(())
    }

    async fn set_group_mute(&self, _room_id: &str, enabled: bool) -> Result<(), CollaboratorError> {
        self.record(None, ModerationAction::GroupMute { enabled });
        Ok(())
    }

    async fn grant_speaking_right(
        &self,
        _room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(Some(player_id), ModerationAction::GrantSpeaking);
        Ok(())
    }

    async fn revoke_speaking_right(
        &self,
        _room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(Some(player_id), ModerationAction::RevokeSpeaking);
        Ok(())
    }

    async fn rename_to_seat(
        &self,
        _room_id: &str,
        player_id: &str,
        seat: u32,
    ) -> Result<(), CollaboratorError> {
        self.record(Some(player_id), ModerationAction::Rename { seat });
        Ok(())
    }

    async fn restore_name(
        &self,
        _room_id: &str,
        player_id: &str,
        name: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(
            Some(player_id),
            ModerationAction::RestoreName {
                name: name.to_string(),
            },
        );
        Ok(())
    }
}

/// Every call fails. The game must carry on regardless.
#[derive(Debug, Default)]
pub struct Failing;

fn down(what: &str) -> CollaboratorError {
    CollaboratorError::Delivery(format!("{} unavailable", what))
}

#[async_trait]
impl Messenger for Failing {
    async fn send_group(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(down("group chat"))
    }

    async fn send_direct(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(down("direct chat"))
    }

    async fn send_mention(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(down("mention"))
    }
}

#[async_trait]
impl Moderator for Failing {
    async fn mute(&self, _: &str, _: &str, _: Duration) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("mute".into()))
    }

    async fn unmute(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("unmute".into()))
    }

    async fn set_group_mute(&self, _: &str, _: bool) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("group mute".into()))
    }

    async fn grant_speaking_right(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("grant".into()))
    }

    async fn revoke_speaking_right(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("revoke".into()))
    }

    async fn rename_to_seat(&self, _: &str, _: &str, _: u32) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("rename".into()))
    }

    async fn restore_name(&self, _: &str, _: &str, _: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Moderation("restore".into()))
    }
}

#[async_trait]
impl AgentPlayer for Failing {
    async fn decide(&self, _: AgentContext) -> Result<AgentAction, CollaboratorError> {
        Err(CollaboratorError::Agent("no model".into()))
    }
}

#[async_trait]
impl SummaryGenerator for Failing {
    async fn summarize(&self, _: &EventLog, _: Faction) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Summary("no model".into()))
    }
}

/// Recording doubles plus the manager wired to them.
pub struct Harness {
    pub manager: Arc<GameManager>,
    pub messenger: Arc<RecordingMessenger>,
    pub moderator: Arc<RecordingModerator>,
}

impl Harness {
    pub fn new(config: GameConfig) -> Self {
        Self::with_collaborators(config, Collaborators::silent())
    }

    /// Records messages and moderation on top of `base`.
    pub fn with_collaborators(config: GameConfig, base: Collaborators) -> Self {
        setup_test_env();
        let messenger = Arc::new(RecordingMessenger::default());
        let moderator = Arc::new(RecordingModerator::default());
        let collaborators = base
            .with_messenger(messenger.clone())
            .with_moderator(moderator.clone());
        Self {
            manager: GameManager::new(config, collaborators, Some(7)),
            messenger,
            moderator,
        }
    }

    /// Creates `room_id` owned by `p1` and joins `p1..=pN` in order.
    pub async fn fill_room(&self, room_id: &str, players: usize) {
        self.manager
            .create_room(room_id, "p1", None)
            .await
            .expect("create room");
        for n in 1..=players {
            self.manager
                .join_room(room_id, Player::new(format!("p{}", n), format!("Player{}", n)))
                .await
                .expect("join room");
        }
    }
}

/// Default nine-seat layout: seats 1-3 werewolves, 4 seer, 5 witch, 6 hunter, 7-9 villagers.
pub fn standard_roles() -> Vec<Role> {
    GameConfig::default().roles_pool()
}

/// Configuration without a summary request at game end.
pub fn quiet_config() -> GameConfig {
    GameConfig {
        enable_summary: false,
        ..GameConfig::default()
    }
}
