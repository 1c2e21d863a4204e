//! Conversation turns and bounded session history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Documents the answer drew on; only set on assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), sources: None, timestamp: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources: Some(sources),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation history holding at most `max_turns` turns. When full,
/// the oldest turns are dropped first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self { turns: Vec::new(), max_turns: max_turns.max(1) }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        if self.turns.len() > self.max_turns {
            let drain_to = self.turns.len() - self.max_turns;
            self.turns.drain(0..drain_to);
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_turns_are_dropped_first() {
        let mut history = ConversationHistory::new(3);
        for i in 0..5 {
            history.push(ConversationTurn::user(format!("q{i}")));
        }
        let contents: Vec<&str> = history.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn assistant_turns_carry_sources() {
        let turn = ConversationTurn::assistant("answer", vec!["a.txt".into()]);
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.sources.as_deref(), Some(&["a.txt".to_string()][..]));
        assert!(ConversationTurn::user("q").sources.is_none());
    }

    #[test]
    fn serializes_role_in_lowercase() {
        let json = serde_json::to_value(ConversationTurn::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("sources").is_none());
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ConversationHistory::new(2);
        history.push(ConversationTurn::user("q"));
        history.clear();
        assert!(history.is_empty());
    }
}
