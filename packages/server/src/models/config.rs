use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("role counts add up to {actual} but total_players is {expected}")]
    RoleCountMismatch { expected: usize, actual: usize },
    #[error("a game needs at least one werewolf")]
    NoWerewolves,
    #[error("timeout {0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("timeout_dead_min must not exceed timeout_dead_max")]
    DeadWindowInverted,
}

/// Role mix, per-phase timeouts and moderation settings for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub total_players: usize,
    pub werewolf_count: usize,
    pub seer_count: usize,
    pub witch_count: usize,
    pub hunter_count: usize,
    pub villager_count: usize,

    // 各フェーズの制限時間（秒）
    pub timeout_wolf: u64,
    pub timeout_seer: u64,
    pub timeout_witch: u64,
    pub timeout_hunter: u64,
    pub timeout_speaking: u64,
    pub timeout_vote: u64,
    // 死亡済み役職の待機時間（秒）
    pub timeout_dead_min: u64,
    pub timeout_dead_max: u64,
    pub vote_reminder_secs: u64,

    pub ban_duration_days: u64,
    pub enable_summary: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_players: 9,
            werewolf_count: 3,
            seer_count: 1,
            witch_count: 1,
            hunter_count: 1,
            villager_count: 3,
            timeout_wolf: 120,
            timeout_seer: 120,
            timeout_witch: 120,
            timeout_hunter: 120,
            timeout_speaking: 120,
            timeout_vote: 120,
            timeout_dead_min: 10,
            timeout_dead_max: 15,
            vote_reminder_secs: 30,
            ban_duration_days: 30,
            enable_summary: true,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            total_players: env_or("WEREWOLF_TOTAL_PLAYERS", defaults.total_players),
            werewolf_count: env_or("WEREWOLF_WEREWOLF_COUNT", defaults.werewolf_count),
            seer_count: env_or("WEREWOLF_SEER_COUNT", defaults.seer_count),
            witch_count: env_or("WEREWOLF_WITCH_COUNT", defaults.witch_count),
            hunter_count: env_or("WEREWOLF_HUNTER_COUNT", defaults.hunter_count),
            villager_count: env_or("WEREWOLF_VILLAGER_COUNT", defaults.villager_count),
            timeout_wolf: env_or("WEREWOLF_TIMEOUT_WOLF", defaults.timeout_wolf),
            timeout_seer: env_or("WEREWOLF_TIMEOUT_SEER", defaults.timeout_seer),
            timeout_witch: env_or("WEREWOLF_TIMEOUT_WITCH", defaults.timeout_witch),
            timeout_hunter: env_or("WEREWOLF_TIMEOUT_HUNTER", defaults.timeout_hunter),
            timeout_speaking: env_or("WEREWOLF_TIMEOUT_SPEAKING", defaults.timeout_speaking),
            timeout_vote: env_or("WEREWOLF_TIMEOUT_VOTE", defaults.timeout_vote),
            timeout_dead_min: env_or("WEREWOLF_TIMEOUT_DEAD_MIN", defaults.timeout_dead_min),
            timeout_dead_max: env_or("WEREWOLF_TIMEOUT_DEAD_MAX", defaults.timeout_dead_max),
            vote_reminder_secs: env_or("WEREWOLF_VOTE_REMINDER_SECS", defaults.vote_reminder_secs),
            ban_duration_days: env_or("WEREWOLF_BAN_DURATION_DAYS", defaults.ban_duration_days),
            enable_summary: env::var("WEREWOLF_ENABLE_SUMMARY")
                .map(|v| v == "true")
                .unwrap_or(defaults.enable_summary),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let actual = self.werewolf_count
            + self.seer_count
            + self.witch_count
            + self.hunter_count
            + self.villager_count;
        if actual != self.total_players {
            return Err(ConfigError::RoleCountMismatch {
                expected: self.total_players,
                actual,
            });
        }
        if self.werewolf_count == 0 {
            return Err(ConfigError::NoWerewolves);
        }
        for (name, secs) in [
            ("timeout_wolf", self.timeout_wolf),
            ("timeout_seer", self.timeout_seer),
            ("timeout_witch", self.timeout_witch),
            ("timeout_hunter", self.timeout_hunter),
            ("timeout_speaking", self.timeout_speaking),
            ("timeout_vote", self.timeout_vote),
            ("timeout_dead_min", self.timeout_dead_min),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }
        if self.timeout_dead_min > self.timeout_dead_max {
            return Err(ConfigError::DeadWindowInverted);
        }
        Ok(())
    }

    /// One entry per seat, unshuffled.
    pub fn roles_pool(&self) -> Vec<Role> {
        let mut pool = Vec::with_capacity(self.total_players);
        for (role, count) in [
            (Role::Werewolf, self.werewolf_count),
            (Role::Seer, self.seer_count),
            (Role::Witch, self.witch_count),
            (Role::Hunter, self.hunter_count),
            (Role::Villager, self.villager_count),
        ] {
            pool.extend(std::iter::repeat(role).take(count));
        }
        pool
    }

    pub fn special_count(&self) -> usize {
        self.seer_count + self.witch_count + self.hunter_count
    }

    pub fn ban_duration(&self) -> Duration {
        Duration::from_secs(self.ban_duration_days.saturating_mul(86_400))
    }

    pub fn describe(&self) -> String {
        let specials: Vec<String> = [
            (Role::Seer, self.seer_count),
            (Role::Witch, self.witch_count),
            (Role::Hunter, self.hunter_count),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(role, n)| {
            if n > 1 {
                format!("{} x{}", role, n)
            } else {
                role.to_string()
            }
        })
        .collect();
        format!(
            "{} players: {} werewolves + {} special ({}) + {} villagers",
            self.total_players,
            self.werewolf_count,
            self.special_count(),
            specials.join(", "),
            self.villager_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_nine_player_game() {
        let config = GameConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.roles_pool().len(), 9);
        assert_eq!(
            config
                .roles_pool()
                .iter()
                .filter(|r| **r == Role::Werewolf)
                .count(),
            3
        );
    }

    #[test]
    fn mismatched_role_counts_are_rejected() {
        let config = GameConfig {
            villager_count: 4,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RoleCountMismatch {
                expected: 9,
                actual: 10
            })
        );
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = GameConfig {
            timeout_vote: 0,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout("timeout_vote")));
    }

    #[test]
    fn ban_duration_saturates_instead_of_overflowing() {
        assert_eq!(
            GameConfig::default().ban_duration(),
            Duration::from_secs(30 * 86_400)
        );
        let config = GameConfig {
            ban_duration_days: u64::MAX / 2,
            ..GameConfig::default()
        };
        assert_eq!(config.ban_duration(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn description_lists_special_roles() {
        let text = GameConfig::default().describe();
        assert!(text.contains("Seer, Witch, Hunter"));
        assert!(text.starts_with("9 players"));
    }
}
