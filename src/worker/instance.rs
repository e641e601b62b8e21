// Per-worker record owned by the monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::worker::state::WorkerState;

/// Review state of the worker's pull request, when one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    None,
    Pending,
    Approved,
    ChangesRequested,
}

/// One worker's lifecycle record.
///
/// Owned and mutated by the monitor; the detectors and the intervention
/// policy only read it. Every observed signal refreshes `last_activity`
/// even when no state change results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInstance {
    pub id: String,
    pub state: WorkerState,
    pub last_activity: DateTime<Utc>,
    pub last_error: Option<String>,
    pub pr_number: Option<u64>,
    pub pr_url: Option<String>,
    pub review_status: ReviewStatus,
    /// Names of the agents that have run against this worker, in order.
    /// A restart appends a fresh entry, so repeated recoveries are visible.
    pub agents_run: Vec<String>,
}

impl WorkerInstance {
    pub fn new(id: impl Into<String>, spawned_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            state: WorkerState::Spawning,
            last_activity: spawned_at,
            last_error: None,
            pr_number: None,
            pr_url: None,
            review_status: ReviewStatus::None,
            agents_run: Vec::new(),
        }
    }

    /// Refresh the activity timestamp without a state change.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn record_pr(&mut self, url: impl Into<String>, number: u64) {
        self.pr_url = Some(url.into());
        self.pr_number = Some(number);
        if self.review_status == ReviewStatus::None {
            self.review_status = ReviewStatus::Pending;
        }
    }

    /// Elapsed time since the last observed activity.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}
