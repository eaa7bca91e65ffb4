//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: the pipeline stage of one crawl task (pending, fetching,
//!   filtering, writing, and the terminal done/failed/skipped)
//! - `TaskProgress`: a tracker that only allows legal moves between states

mod task_state;

pub use task_state::TaskState;

use crate::DocsError;

/// Tracks one task through the pipeline, rejecting illegal moves
#[derive(Debug, Clone, Copy)]
pub struct TaskProgress {
    state: TaskState,
}

impl TaskProgress {
    pub fn new() -> Self {
        Self {
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Moves to `next`, or fails with `InvalidTransition`
    pub fn advance(&mut self, next: TaskState) -> Result<TaskState, DocsError> {
        if !self.state.can_transition_to(next) {
            return Err(DocsError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("task state {} -> {}", self.state, next);
        self.state = next;
        Ok(next)
    }
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self::new()
    }
}
