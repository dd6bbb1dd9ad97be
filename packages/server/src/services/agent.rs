use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::collaborators::{AgentAction, AgentContext, AgentPlayer, CollaboratorError};

pub const DEFAULT_UTTERANCE: &str = "I have nothing to add for now.";

/// Automated participant that picks uniformly among the offered candidates.
pub struct RandomAgent {
    rng: Mutex<StdRng>,
}

impl RandomAgent {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

#[async_trait]
impl AgentPlayer for RandomAgent {
    async fn decide(&self, context: AgentContext) -> Result<AgentAction, CollaboratorError> {
        if context.candidates.is_empty() {
            return Ok(AgentAction::Speech(DEFAULT_UTTERANCE.to_string()));
        }
        let choice = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| CollaboratorError::Agent("rng lock poisoned".to_string()))?;
            context.candidates.choose(&mut *rng).cloned()
        };
        debug!(
            room_id = %context.room_id,
            participant = %context.player_id,
            phase = %context.phase,
            choice = ?choice,
            "automated participant decided"
        );
        Ok(choice.map(AgentAction::Target).unwrap_or(AgentAction::Abstain))
    }
}
