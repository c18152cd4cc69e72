//! Turn and Conversation domain types.
//!
//! These are the value objects that flow through the pipeline:
//! user sends a message → it becomes a [`Turn`] → the model reply becomes another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Key of a conversation: a persona name or a chat-room id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// A fresh random id, for chat rooms that have no natural key.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the app
    User,
    /// The model speaking as the persona
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(ValidationError::UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub role: Role,

    /// The text content (never empty)
    #[serde(alias = "message")]
    pub text: String,

    /// When it was said
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time.
    pub fn new(role: Role, text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::at(role, text, Utc::now())
    }

    /// Create a turn with an explicit timestamp.
    pub fn at(
        role: Role,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Self {
            role,
            text,
            timestamp,
        })
    }

    pub fn user(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::Assistant, text)
    }
}

/// An ordered, append-only sequence of turns scoped to one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Whose conversation this is
    pub identity: ConversationId,

    /// Ordered turns (insertion order)
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new(identity: ConversationId) -> Self {
        Self {
            identity,
            turns: Vec::new(),
        }
    }

    /// Rebuild a conversation from previously persisted turns.
    ///
    /// Timestamps are re-clamped so the sequence stays non-decreasing even if
    /// the stored copy was edited by hand.
    pub fn from_turns(identity: ConversationId, turns: Vec<Turn>) -> Self {
        let mut conversation = Self::new(identity);
        for turn in turns {
            conversation.push(turn);
        }
        conversation
    }

    /// Append a turn. A timestamp older than the last turn is raised to it.
    pub fn push(&mut self, mut turn: Turn) -> &Turn {
        if let Some(last) = self.turns.last() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello!").unwrap();
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text, "Hello!");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(Turn::user("").unwrap_err(), ValidationError::EmptyText);
        assert_eq!(Turn::assistant("  \n").unwrap_err(), ValidationError::EmptyText);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(
            "unknown".parse::<Role>().unwrap_err(),
            ValidationError::UnknownRole("unknown".into())
        );
    }

    #[test]
    fn push_keeps_timestamps_non_decreasing() {
        let now = Utc::now();
        let mut conv = Conversation::new(ConversationId::from("anna"));
        conv.push(Turn::at(Role::User, "first", now).unwrap());
        let second = conv
            .push(Turn::at(Role::Assistant, "second", now - Duration::seconds(30)).unwrap())
            .clone();
        assert_eq!(second.timestamp, now);
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn legacy_message_field_is_accepted() {
        let json = r#"{"role":"user","message":"Привет","timestamp":"2026-01-01T00:00:00Z"}"#;
        let turn: Turn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.text, "Привет");
        assert_eq!(turn.role, Role::User);
    }

    #[test]
    fn serialized_role_is_lowercase() {
        let turn = Turn::assistant("Hi").unwrap();
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        assert!(json.contains(r#""text":"Hi""#));
    }
}
