use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a log entry while the game is running. The whole log is
/// handed to the summary generator once the game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,  // 全体に公開
    Wolf,    // 人狼のみ
    Private, // 本人のみ（占い結果など）
    System,  // 区切りなど
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub visibility: Visibility,
    pub text: String,
}

/// Append-only record of the game, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, visibility: Visibility, text: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            visibility,
            text: text.into(),
        });
    }

    pub fn public(&mut self, text: impl Into<String>) {
        self.push(Visibility::Public, text);
    }

    pub fn secret(&mut self, text: impl Into<String>) {
        self.push(Visibility::Private, text);
    }

    pub fn wolf(&mut self, text: impl Into<String>) {
        self.push(Visibility::Wolf, text);
    }

    pub fn separator(&mut self) {
        self.push(Visibility::System, "=".repeat(30));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `limit` public entries, oldest first.
    pub fn recent_public(&self, limit: usize) -> Vec<String> {
        let mut recent: Vec<String> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.visibility == Visibility::Public)
            .take(limit)
            .map(|e| e.text.clone())
            .collect();
        recent.reverse();
        recent
    }

    pub fn lines(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.text.contains(needle))
    }
}
