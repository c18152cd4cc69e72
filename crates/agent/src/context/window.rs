//! Context window builder.
//!
//! # Determinism
//!
//! Rendering is a pure function of the turns, the window size and the role
//! labels. No time-dependent data (timestamps included) reaches the output.

use wingman_core::turn::{Role, Turn};

/// Rendered in place of history when there is nothing to show.
pub const EMPTY_HISTORY_SENTINEL: &str = "This is the beginning of your conversation.";

/// Number of trailing turns rendered by default.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Display labels for the two speakers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLabels {
    pub user: String,
    pub assistant: String,
}

impl RoleLabels {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user,
            Role::Assistant => &self.assistant,
        }
    }
}

/// The last `size` turns of a conversation, rendered with fixed labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    size: usize,
    labels: RoleLabels,
}

impl ContextWindow {
    pub fn new(size: usize, labels: RoleLabels) -> Self {
        Self { size, labels }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn labels(&self) -> &RoleLabels {
        &self.labels
    }

    /// Same size, different speakers.
    pub fn with_labels(&self, labels: RoleLabels) -> Self {
        Self::new(self.size, labels)
    }

    /// The trailing turns that fall inside the window, oldest first.
    pub fn select<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        select(turns, self.size)
    }

    pub fn render(&self, turns: &[Turn]) -> String {
        render(turns, self.size, &self.labels)
    }
}

/// The last `min(window_size, turns.len())` turns.
pub fn select(turns: &[Turn], window_size: usize) -> &[Turn] {
    let start = turns.len().saturating_sub(window_size);
    &turns[start..]
}

/// Render the trailing window as `"{label}: {text}"` lines joined by `\n`.
///
/// An empty selection (no turns, or a zero-sized window) renders
/// [`EMPTY_HISTORY_SENTINEL`].
pub fn render(turns: &[Turn], window_size: usize, labels: &RoleLabels) -> String {
    let selected = select(turns, window_size);
    if selected.is_empty() {
        return EMPTY_HISTORY_SENTINEL.to_string();
    }

    selected
        .iter()
        .map(|turn| format!("{}: {}", labels.label(turn.role), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}
