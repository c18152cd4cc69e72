//! # Wingman Agent
//!
//! The conversation pipeline: render the recent history, assemble the
//! persona prompt, call the gateway, record the reply. Also hosts the coach
//! features that reuse the same gateway and window size.

pub mod coach;
pub mod context;
pub mod pipeline;
pub mod prompt;
pub mod recorder;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use coach::Coach;
pub use context::{ContextWindow, RoleLabels};
pub use pipeline::{ChatPipeline, ConversationStats, Reply, ReplyStatus, TurnPhase};
pub use prompt::{AssembledPrompt, PromptAssembler};
pub use recorder::ReplyRecorder;
