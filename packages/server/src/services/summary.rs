use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::collaborators::{CollaboratorError, SummaryGenerator};
use crate::models::{event_log::EventLog, role::Faction};

const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced werewolf game analyst. \
Write a short, lively post-game review from the game log you are given: \
point out the turning points, judge each side's strategy and mistakes, \
quote memorable werewolf night chat if there is any, \
and finish by naming an MVP and the least active player. \
Keep it under 400 words.";

/// Chat-completion client that turns the full event log into a narrative review.
#[derive(Clone)]
pub struct HttpSummaryGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

impl HttpSummaryGenerator {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            prompt: None,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Custom system prompt; `{winning_faction}` and `{game_data}` are substituted.
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    fn game_data(log: &EventLog, winner: Faction) -> String {
        let mut lines = vec![format!("Winner: {}", winner), String::new()];
        lines.extend(log.lines().into_iter().map(str::to_string));
        lines.join("\n")
    }

    fn system_prompt(&self, game_data: &str, winner: Faction) -> String {
        match &self.prompt {
            Some(custom) => custom
                .replace("{winning_faction}", &winner.to_string())
                .replace("{game_data}", game_data),
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[async_trait]
impl SummaryGenerator for HttpSummaryGenerator {
    async fn summarize(
        &self,
        log: &EventLog,
        winner: Faction,
    ) -> Result<String, CollaboratorError> {
        let game_data = Self::game_data(log, winner);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt(&game_data, winner) },
                { "role": "user", "content": format!("Review this werewolf game:\n\n{}", game_data) }
            ]
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollaboratorError::Summary(e.to_string()))?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "summary endpoint returned an error");
            return Err(CollaboratorError::Summary(format!(
                "status {}",
                response.status()
            )));
        }
        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Summary(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        info!(chars = text.len(), "post-game summary generated");
        Ok(format!(
            "\n\n🤖 Game review\n{}\n{}\n{}",
            "=".repeat(30),
            text.trim(),
            "=".repeat(30)
        ))
    }
}
