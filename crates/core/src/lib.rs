//! # Wingman Core
//!
//! Domain types, traits, and error definitions for the Wingman dating coach.
//! This crate has **no I/O**: it defines the model that all other crates
//! implement against.
//!
//! Every external collaborator is a trait here: [`HistoryBackend`] for the
//! persisted copy of a conversation, [`Gateway`] for the remote model.
//! Implementations live in `wingman-memory` and `wingman-providers`.

pub mod error;
pub mod gateway;
pub mod history;
pub mod persona;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayError, PersistenceError, Result, ValidationError};
pub use gateway::{Attachment, Completion, CompletionRequest, Gateway, Usage};
pub use history::HistoryBackend;
pub use persona::{ChatPlatform, MatchProfile, Persona, Personality, UserProfile};
pub use turn::{Conversation, ConversationId, Role, Turn};
