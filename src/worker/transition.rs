// Transition validation and application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::worker::instance::WorkerInstance;
use crate::worker::state::{is_valid_transition, WorkerState};

/// Record of an accepted transition, handed to observers for durable
/// history. Observer failure never gates acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub worker_id: String,
    pub from: WorkerState,
    pub to: WorkerState,
    pub occurred_at: DateTime<Utc>,
}

/// Commit a detector-proposed state onto the worker if the transition is
/// legal, returning the event to broadcast. Illegal proposals are rejected
/// silently with no mutation: a stale signal racing a concurrent milestone
/// is expected, not an error, so the caller logs and discards.
pub fn apply_if_valid(
    worker: &mut WorkerInstance,
    proposed: WorkerState,
    now: DateTime<Utc>,
) -> Option<TransitionEvent> {
    let from = worker.state;
    if !is_valid_transition(from, proposed) {
        debug!(
            worker_id = %worker.id,
            from = ?from,
            proposed = ?proposed,
            "Rejected transition proposal"
        );
        return None;
    }

    worker.state = proposed;
    worker.last_activity = now;
    info!(
        worker_id = %worker.id,
        from = ?from,
        to = ?proposed,
        "Worker state transition"
    );
    Some(TransitionEvent {
        worker_id: worker.id.clone(),
        from,
        to: proposed,
        occurred_at: now,
    })
}
