use once_cell::sync::Lazy;
use std::env;
use std::net::SocketAddr;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);

/// Process-wide server settings. Game rules live in `GameConfig`.
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub seed: Option<u64>,
    pub summary_endpoint: Option<String>,
    pub summary_model: String,
    pub summary_api_key: Option<String>,
    pub summary_prompt: Option<String>,
}

impl Config {
    fn new() -> Self {
        Self {
            bind_addr: env::var("SERVER_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080))),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            seed: env::var("WEREWOLF_SEED").ok().and_then(|v| v.parse().ok()),
            summary_endpoint: non_empty("SUMMARY_ENDPOINT"),
            summary_model: env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            summary_api_key: non_empty("SUMMARY_API_KEY"),
            summary_prompt: non_empty("SUMMARY_PROMPT"),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
