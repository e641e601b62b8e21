// Intervention policy: when a worker needs help, and what kind
//
// Restart and nudge are distinct remedies. Restart discards the agent and
// relaunches it; nudge re-prompts an already-running agent that has gone
// quiet. Conflating them would either waste work or fail to recover hard
// errors.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::worker::instance::WorkerInstance;
use crate::worker::state::WorkerState;

/// Corrective actions the orchestrator can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionAction {
    /// Discard the agent process and relaunch it with a fresh turn
    Restart,
    /// Send a continuation prompt to a stalled but live agent
    Nudge,
}

/// Outcome of one policy evaluation. Computed fresh on every call, never
/// stored; evaluation is pure and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionDecision {
    pub needed: bool,
    pub action: Option<InterventionAction>,
}

impl InterventionDecision {
    pub fn none() -> Self {
        Self {
            needed: false,
            action: None,
        }
    }

    pub fn act(action: InterventionAction) -> Self {
        Self {
            needed: true,
            action: Some(action),
        }
    }
}

/// Deterministic staleness policy over worker state and elapsed idle time.
///
/// The clock is injected: callers pass `now` explicitly so tests can
/// simulate elapsed time without real delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterventionPolicy {
    /// Idle time after which a Working agent is considered stalled.
    pub stale_after: Duration,
}

impl Default for InterventionPolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::minutes(10),
        }
    }
}

impl InterventionPolicy {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    /// Decide whether the orchestrator must act on this worker.
    ///
    /// Errors always demand a restart, regardless of elapsed time. A
    /// Working agent idle past the staleness threshold gets a nudge.
    /// Everything else is left alone: pre-work states stall on slow
    /// environment setup, not dead agents, and review/merge states wait
    /// on humans or CI.
    pub fn needs_intervention(
        &self,
        worker: &WorkerInstance,
        now: DateTime<Utc>,
    ) -> InterventionDecision {
        match worker.state {
            WorkerState::Error => InterventionDecision::act(InterventionAction::Restart),
            WorkerState::Working if worker.idle_for(now) >= self.stale_after => {
                InterventionDecision::act(InterventionAction::Nudge)
            }
            _ => InterventionDecision::none(),
        }
    }
}
