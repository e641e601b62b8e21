// Per-state rendering metadata for the CLI and status surfaces

use serde::{Deserialize, Serialize};

use crate::worker::state::WorkerState;

/// Operator commands that can be offered against a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerAction {
    Stop,
    Send,
    Status,
    Review,
    Merge,
    Retry,
    Logs,
    Cleanup,
}

/// Short human-readable description of a state. Non-empty for every state.
pub fn state_description(state: WorkerState) -> &'static str {
    match state {
        WorkerState::Spawning => "Spawning worker process",
        WorkerState::Initializing => "Setting up workspace and agent",
        WorkerState::Working => "Agent is working on the task",
        WorkerState::PrOpen => "Pull request opened",
        WorkerState::Reviewing => "Pull request under review",
        WorkerState::Merging => "Merging pull request",
        WorkerState::Merged => "Work merged",
        WorkerState::Error => "Worker hit an error",
        WorkerState::Stopped => "Worker stopped",
    }
}

/// Status glyph for a state. Non-empty for every state; the commonly
/// displayed states carry pairwise-distinct glyphs.
pub fn state_emoji(state: WorkerState) -> &'static str {
    match state {
        WorkerState::Spawning => "🥚",
        WorkerState::Initializing => "🐣",
        WorkerState::Working => "🔨",
        WorkerState::PrOpen => "📬",
        WorkerState::Reviewing => "🔍",
        WorkerState::Merging => "🚂",
        WorkerState::Merged => "✅",
        WorkerState::Error => "❌",
        WorkerState::Stopped => "🛑",
    }
}

/// Operator actions offered per state, in display order. Non-empty for
/// every state; terminal states only expose cleanup.
pub fn available_actions(state: WorkerState) -> &'static [WorkerAction] {
    match state {
        WorkerState::Spawning | WorkerState::Initializing => {
            &[WorkerAction::Stop, WorkerAction::Status]
        }
        WorkerState::Working => &[WorkerAction::Stop, WorkerAction::Send, WorkerAction::Status],
        WorkerState::PrOpen => &[
            WorkerAction::Stop,
            WorkerAction::Send,
            WorkerAction::Status,
            WorkerAction::Review,
            WorkerAction::Merge,
        ],
        WorkerState::Reviewing => &[
            WorkerAction::Stop,
            WorkerAction::Send,
            WorkerAction::Status,
            WorkerAction::Merge,
        ],
        WorkerState::Merging => &[WorkerAction::Status],
        WorkerState::Error => &[WorkerAction::Retry, WorkerAction::Logs, WorkerAction::Cleanup],
        WorkerState::Merged | WorkerState::Stopped => &[WorkerAction::Cleanup],
    }
}
