//! Conversation context rendering.
//!
//! Only the trailing window of a conversation is sent to the model. The
//! window is rendered as plain `label: text` lines, oldest first.

pub mod window;

pub use window::{ContextWindow, DEFAULT_WINDOW_SIZE, EMPTY_HISTORY_SENTINEL, RoleLabels, render};
