//! Conversation history storage for Wingman.
//!
//! [`TurnStore`] owns one conversation in memory and mirrors it to a
//! [`HistoryBackend`](wingman_core::HistoryBackend) after every change.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod turn_store;

pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use noop::NoopHistory;
pub use turn_store::{Appended, TurnStore};
