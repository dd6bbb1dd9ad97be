use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::collaborators::{CollaboratorError, Messenger, Moderator};

/// Everything pushed to a room's websocket subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ChannelEvent {
    Group {
        text: String,
        timestamp: String,
    },
    Direct {
        to: String,
        text: String,
        timestamp: String,
    },
    Mention {
        player_id: String,
        text: String,
        timestamp: String,
    },
    Moderation {
        action: ModerationAction,
        player_id: Option<String>,
        timestamp: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModerationAction {
    Mute { seconds: u64 },
    Unmute,
    GroupMute { enabled: bool },
    GrantSpeaking,
    RevokeSpeaking,
    Rename { seat: u32 },
    RestoreName { name: String },
}

impl ChannelEvent {
    /// Whether a subscriber identified as `player_id` should receive this event.
    pub fn is_visible_to(&self, player_id: Option<&str>) -> bool {
        match self {
            ChannelEvent::Direct { to, .. } => player_id == Some(to.as_str()),
            _ => true,
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// In-process chat surface: one broadcast channel per room, drained by websockets.
#[derive(Clone, Default)]
pub struct RoomChannels {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<ChannelEvent>>>>,
}

impl RoomChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, room_id: &str) -> broadcast::Sender<ChannelEvent> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(1000);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    pub async fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ChannelEvent> {
        self.get_or_create(room_id).await.subscribe()
    }

    pub async fn remove(&self, room_id: &str) {
        self.channels.lock().await.remove(room_id);
    }

    async fn publish(&self, room_id: &str, event: ChannelEvent) {
        let tx = self.get_or_create(room_id).await;
        // 購読者がいなくても失敗扱いにしない
        if tx.send(event).is_err() {
            debug!(room_id, "no subscribers on room channel");
        }
    }

    async fn moderate(&self, room_id: &str, player_id: Option<&str>, action: ModerationAction) {
        self.publish(
            room_id,
            ChannelEvent::Moderation {
                action,
                player_id: player_id.map(str::to_string),
                timestamp: now(),
            },
        )
        .await;
    }
}

#[async_trait]
impl Messenger for RoomChannels {
    async fn send_group(&self, room_id: &str, text: &str) -> Result<(), CollaboratorError> {
        self.publish(
            room_id,
            ChannelEvent::Group {
                text: text.to_string(),
                timestamp: now(),
            },
        )
        .await;
        Ok(())
    }

    async fn send_direct(
        &self,
        room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.publish(
            room_id,
            ChannelEvent::Direct {
                to: player_id.to_string(),
                text: text.to_string(),
                timestamp: now(),
            },
        )
        .await;
        Ok(())
    }

    async fn send_mention(
        &self,
        room_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.publish(
            room_id,
            ChannelEvent::Mention {
                player_id: player_id.to_string(),
                text: text.to_string(),
                timestamp: now(),
            },
        )
        .await;
        Ok(())
    }
}

#[async_trait]
impl Moderator for RoomChannels {
    async fn mute(
        &self,
        room_id: &str,
        player_id: &str,
        duration: Duration,
    ) -> Result<(), CollaboratorError> {
        self.moderate(
            room_id,
            Some(player_id),
            ModerationAction::Mute {
                seconds: duration.as_secs(),
            },
        )
        .await;
        Ok(())
    }

    async fn unmute(&self, room_id: &str, player_id: &str) -> Result<(), CollaboratorError> {
        self.moderate(room_id, Some(player_id), ModerationAction::Unmute)
            .await;
        Ok(())
    }

    async fn set_group_mute(&self, room_id: &str, enabled: bool) -> Result<(), CollaboratorError> {
        self.moderate(room_id, None, ModerationAction::GroupMute { enabled })
            .await;
        Ok(())
    }

    async fn grant_speaking_right(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError> {
        self.moderate(room_id, Some(player_id), ModerationAction::GrantSpeaking)
            .await;
        Ok(())
    }

    async fn revoke_speaking_right(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<(), CollaboratorError> {
        self.moderate(room_id, Some(player_id), ModerationAction::RevokeSpeaking)
            .await;
        Ok(())
    }

    async fn rename_to_seat(
        &self,
        room_id: &str,
        player_id: &str,
        seat: u32,
    ) -> Result<(), CollaboratorError> {
        self.moderate(room_id, Some(player_id), ModerationAction::Rename { seat })
            .await;
        Ok(())
    }

    async fn restore_name(
        &self,
        room_id: &str,
        player_id: &str,
        name: &str,
    ) -> Result<(), CollaboratorError> {
        self.moderate(
            room_id,
            Some(player_id),
            ModerationAction::RestoreName {
                name: name.to_string(),
            },
        )
        .await;
        Ok(())
    }
}
