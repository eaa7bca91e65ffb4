/// Task state definitions for tracking crawl progress
///
/// This module defines every state a crawl task can be in and which moves
/// between them are legal.
use std::fmt;

/// Represents the current state of a task in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is in the frontier, waiting for a dispatcher permit
    Pending,

    /// Page is being fetched
    Fetching,

    /// Content filter is running over the fetched page
    Filtering,

    /// Markdown is being written to its target
    Writing,

    // ===== Terminal States =====
    /// Page was fetched, filtered and written
    Done,

    /// Fetch or write failed
    Failed,

    /// Page was not written (no substantive content, not HTML, bad target)
    Skipped,
}

impl TaskState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }

    /// Returns true if this is an active state (task may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the pipeline may move from `self` to `next`
    ///
    /// ```text
    /// Pending -> Fetching -> Filtering -> Writing -> Done
    ///                 |           |           |
    ///                 |           +-> Skipped +-> Failed
    ///                 +-> Failed / Skipped
    /// ```
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Fetching, Filtering)
                | (Fetching, Failed)
                | (Fetching, Skipped)
                | (Filtering, Writing)
                | (Filtering, Skipped)
                | (Writing, Done)
                | (Writing, Failed)
                | (Writing, Skipped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Filtering,
            Self::Writing,
            Self::Done,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
