// Worker lifecycle states and the static transition table

use serde::{Deserialize, Serialize};

/// Lifecycle states a worker moves through from spawn to completion.
///
/// The happy path is Spawning → Initializing → Working → PrOpen →
/// Reviewing → Merging → Merged. Error is reachable from every
/// non-terminal state and is recoverable (back to Working) or fatal
/// (Stopped). Merged and Stopped are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Process is being spawned, workspace not ready yet
    Spawning,
    /// Workspace exists, agent is booting and reading context
    Initializing,
    /// Agent is actively editing files and running commands
    Working,
    /// A pull request has been opened for the worker's branch
    PrOpen,
    /// The pull request is under review
    Reviewing,
    /// Merge has been requested and is in flight
    Merging,
    /// Work landed on the base branch
    Merged,
    /// Agent or API reported a failure
    Error,
    /// Worker was shut down without merging
    Stopped,
}

impl WorkerState {
    /// States this one may legally transition to, in preference order.
    ///
    /// The table encodes only the happy path plus the explicit Error
    /// recovery edges. Error reachability from non-terminal states is a
    /// uniform rule layered on top in `is_valid_transition`, not
    /// duplicated per row.
    pub fn allowed_transitions(self) -> &'static [WorkerState] {
        match self {
            WorkerState::Spawning => &[WorkerState::Initializing],
            WorkerState::Initializing => &[WorkerState::Working],
            WorkerState::Working => &[WorkerState::PrOpen],
            WorkerState::PrOpen => &[WorkerState::Reviewing],
            // Changes-requested reviews send the worker back to work
            WorkerState::Reviewing => &[WorkerState::Merging, WorkerState::Working],
            WorkerState::Merging => &[WorkerState::Merged],
            WorkerState::Error => &[WorkerState::Working, WorkerState::Stopped],
            WorkerState::Merged | WorkerState::Stopped => &[],
        }
    }

    /// True iff the state has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Position along the happy path, used to gate "don't move backwards"
    /// detector heuristics. Error and Stopped sit outside the path.
    pub(crate) fn progress_rank(self) -> Option<u8> {
        match self {
            WorkerState::Spawning => Some(0),
            WorkerState::Initializing => Some(1),
            WorkerState::Working => Some(2),
            WorkerState::PrOpen => Some(3),
            WorkerState::Reviewing => Some(4),
            WorkerState::Merging => Some(5),
            WorkerState::Merged => Some(6),
            WorkerState::Error | WorkerState::Stopped => None,
        }
    }

    /// True when this state comes strictly before `other` on the happy path.
    pub(crate) fn precedes(self, other: WorkerState) -> bool {
        match (self.progress_rank(), other.progress_rank()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

/// Check a proposed transition against the table.
///
/// Any non-terminal state may additionally transition to Error; that rule
/// is applied here uniformly rather than listed in every table row.
pub fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    if to == WorkerState::Error {
        return !from.is_terminal();
    }
    from.allowed_transitions().contains(&to)
}

/// True iff `state` accepts no further transitions (Merged, Stopped).
pub fn is_terminal_state(state: WorkerState) -> bool {
    state.is_terminal()
}
