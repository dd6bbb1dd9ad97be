use std::sync::Arc;

use crate::models::config::GameConfig;
use crate::services::{
    agent::RandomAgent,
    channels::RoomChannels,
    collaborators::{Collaborators, SummaryGenerator},
    game_service::GameManager,
    summary::HttpSummaryGenerator,
};
use crate::utils::config::CONFIG;

#[derive(Clone)]
pub struct AppState {
    pub game: Arc<GameManager>,
    pub channels: RoomChannels,
}

impl AppState {
    /// Wires the game manager to the websocket channels, using environment settings.
    pub fn new() -> Self {
        Self::with_config(GameConfig::from_env(), CONFIG.seed)
    }

    pub fn with_config(config: GameConfig, seed: Option<u64>) -> Self {
        let channels = RoomChannels::new();
        let agents = match seed {
            Some(seed) => RandomAgent::seeded(seed),
            None => RandomAgent::from_entropy(),
        };
        let mut collaborators = Collaborators::silent()
            .with_messenger(Arc::new(channels.clone()))
            .with_moderator(Arc::new(channels.clone()))
            .with_agents(Arc::new(agents));
        if let Some(summarizer) = summarizer_from_env() {
            collaborators = collaborators.with_summarizer(summarizer);
        }

        AppState {
            game: GameManager::new(config, collaborators, seed),
            channels,
        }
    }

    /// Uses caller-supplied collaborators; handy for tests.
    pub fn with_collaborators(
        config: GameConfig,
        collaborators: Collaborators,
        seed: Option<u64>,
    ) -> Self {
        AppState {
            game: GameManager::new(config, collaborators, seed),
            channels: RoomChannels::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn summarizer_from_env() -> Option<Arc<dyn SummaryGenerator>> {
    let endpoint = CONFIG.summary_endpoint.clone()?;
    Some(Arc::new(
        HttpSummaryGenerator::new(endpoint, CONFIG.summary_model.clone())
            .with_api_key(CONFIG.summary_api_key.clone())
            .with_prompt(CONFIG.summary_prompt.clone()),
    ))
}
