// Worker monitor: owns the per-worker records and drives the lifecycle core
//
// This is the worker-management side of the boundary: it owns one mutable
// record per worker, feeds incoming signals through the detectors, commits
// proposals through the validator, refreshes activity on every signal, and
// evaluates the intervention policy. Per-worker serialization is the
// caller's contract: one logical owner evaluates a given worker's signals
// at a time.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::observation::TransitionObserver;
use crate::worker::detector::{
    detect_state_from_message, detect_state_from_output, extract_pr_reference,
};
use crate::worker::instance::WorkerInstance;
use crate::worker::intervention::{InterventionDecision, InterventionPolicy};
use crate::worker::signal::Signal;
use crate::worker::state::WorkerState;
use crate::worker::transition::{apply_if_valid, TransitionEvent};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Unknown worker: {id}")]
    UnknownWorker { id: String },
    #[error("Snapshot I/O error: {0}")]
    SnapshotIo(#[from] std::io::Error),
    #[error("Snapshot serialization error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

/// Serialized form of the worker table, persisted so a restarted
/// orchestrator resumes monitoring where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub workers: Vec<WorkerInstance>,
    pub taken_at: DateTime<Utc>,
}

pub struct WorkerMonitor {
    workers: HashMap<String, WorkerInstance>,
    policy: InterventionPolicy,
    observers: Vec<Arc<dyn TransitionObserver>>,
}

impl WorkerMonitor {
    pub fn new(policy: InterventionPolicy) -> Self {
        Self {
            workers: HashMap::new(),
            policy,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TransitionObserver>) {
        self.observers.push(observer);
    }

    /// Register a freshly spawned worker. The process itself is launched
    /// by the caller; the monitor only tracks its lifecycle.
    pub fn spawn_worker(&mut self, agent_name: &str, now: DateTime<Utc>) -> String {
        let id = format!("worker-{}", Uuid::new_v4());
        let mut worker = WorkerInstance::new(id.clone(), now);
        worker.agents_run.push(agent_name.to_string());
        info!(worker_id = %id, agent = %agent_name, "Worker registered");
        self.workers.insert(id.clone(), worker);
        id
    }

    pub fn get(&self, id: &str) -> Option<&WorkerInstance> {
        self.workers.get(id)
    }

    pub fn workers(&self) -> impl Iterator<Item = &WorkerInstance> {
        self.workers.values()
    }

    /// Feed one signal to a worker, in arrival order.
    ///
    /// Activity is refreshed even when no state change results. Returns
    /// the accepted transition event, if any; detector proposals rejected
    /// by the validator are discarded as stale-signal races.
    pub async fn ingest_signal(
        &mut self,
        id: &str,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<Option<TransitionEvent>, MonitorError> {
        let worker = self
            .workers
            .get_mut(id)
            .ok_or_else(|| MonitorError::UnknownWorker { id: id.to_string() })?;

        let proposed = match signal {
            Signal::Message { message } => detect_state_from_message(message, worker.state),
            Signal::RawOutput { text } => detect_state_from_output(text, worker.state),
        };

        let event = match proposed {
            Some(next) => apply_if_valid(worker, next, now),
            None => None,
        };

        // Metadata only follows accepted transitions: a rejected proposal
        // must leave the record exactly as it was, activity aside
        match &event {
            Some(event) if event.to == WorkerState::Error => {
                let detail = match signal {
                    Signal::Message { .. } => "agent reported an error result".to_string(),
                    Signal::RawOutput { text } => text.trim().to_string(),
                };
                worker.record_error(detail);
            }
            Some(event) if event.to == WorkerState::PrOpen => {
                let text = match signal {
                    Signal::Message { message } => message.text_content(),
                    Signal::RawOutput { text } => text.clone(),
                };
                if let Some((url, number)) = extract_pr_reference(&text) {
                    worker.record_pr(url, number);
                }
            }
            _ => {}
        }

        if event.is_none() {
            // No state change, but the worker is alive
            worker.touch(now);
        }

        if let Some(event) = &event {
            for observer in &self.observers {
                observer.on_transition(event).await;
            }
        }

        Ok(event)
    }

    /// Apply a transition the collaborator observed out-of-band (spawn
    /// completed, review started, merge requested, operator stop). Goes
    /// through the same validator as detector proposals; returns false
    /// and leaves the record untouched when the edge is illegal.
    pub async fn apply_transition(
        &mut self,
        id: &str,
        next: WorkerState,
        now: DateTime<Utc>,
    ) -> Result<bool, MonitorError> {
        let worker = self
            .workers
            .get_mut(id)
            .ok_or_else(|| MonitorError::UnknownWorker { id: id.to_string() })?;

        match apply_if_valid(worker, next, now) {
            Some(event) => {
                for observer in &self.observers {
                    observer.on_transition(&event).await;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Evaluate the intervention policy for one worker.
    pub fn evaluate(&self, id: &str, now: DateTime<Utc>) -> Result<InterventionDecision, MonitorError> {
        let worker = self
            .workers
            .get(id)
            .ok_or_else(|| MonitorError::UnknownWorker { id: id.to_string() })?;
        Ok(self.policy.needs_intervention(worker, now))
    }

    /// Evaluate every worker, returning only those needing attention.
    pub fn evaluate_all(&self, now: DateTime<Utc>) -> Vec<(String, InterventionDecision)> {
        let mut flagged: Vec<_> = self
            .workers
            .values()
            .map(|w| (w.id.clone(), self.policy.needs_intervention(w, now)))
            .filter(|(_, decision)| decision.needed)
            .collect();
        flagged.sort_by(|a, b| a.0.cmp(&b.0));
        flagged
    }

    /// Record that the caller restarted an errored worker with a fresh
    /// agent turn. Moves Error → Working through the validator and logs
    /// the new agent run.
    pub async fn record_restart(
        &mut self,
        id: &str,
        agent_name: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MonitorError> {
        let worker = self
            .workers
            .get_mut(id)
            .ok_or_else(|| MonitorError::UnknownWorker { id: id.to_string() })?;

        // Restart is the Error remedy only; a Reviewing worker also has a
        // legal edge to Working, but that is the changes-requested loop,
        // not a restart
        if worker.state != WorkerState::Error {
            warn!(worker_id = %id, state = ?worker.state, "Restart recorded for non-errored worker, ignoring");
            return Ok(false);
        }

        match apply_if_valid(worker, WorkerState::Working, now) {
            Some(event) => {
                worker.agents_run.push(agent_name.to_string());
                worker.last_error = None;
                for observer in &self.observers {
                    observer.on_transition(&event).await;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove and return workers that reached a terminal state.
    pub fn reap_terminal(&mut self) -> Vec<WorkerInstance> {
        let reaped_ids: Vec<String> = self
            .workers
            .values()
            .filter(|w| w.state.is_terminal())
            .map(|w| w.id.clone())
            .collect();
        let mut reaped = Vec::with_capacity(reaped_ids.len());
        for id in reaped_ids {
            if let Some(worker) = self.workers.remove(&id) {
                info!(worker_id = %worker.id, state = ?worker.state, "Reaped terminal worker");
                reaped.push(worker);
            }
        }
        reaped.sort_by(|a, b| a.id.cmp(&b.id));
        reaped
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> MonitorSnapshot {
        let mut workers: Vec<WorkerInstance> = self.workers.values().cloned().collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        MonitorSnapshot {
            workers,
            taken_at: now,
        }
    }

    pub async fn save_snapshot(
        &self,
        path: impl AsRef<Path>,
        now: DateTime<Utc>,
    ) -> Result<(), MonitorError> {
        let json = serde_json::to_string_pretty(&self.snapshot(now))?;
        tokio::fs::write(path.as_ref(), json).await?;
        info!(path = %path.as_ref().display(), "Saved monitor snapshot");
        Ok(())
    }

    pub async fn load_snapshot(
        path: impl AsRef<Path>,
        policy: InterventionPolicy,
    ) -> Result<Self, MonitorError> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: MonitorSnapshot = serde_json::from_str(&json)?;
        let mut monitor = Self::new(policy);
        for worker in snapshot.workers {
            monitor.workers.insert(worker.id.clone(), worker);
        }
        info!(
            path = %path.as_ref().display(),
            workers = monitor.workers.len(),
            "Restored monitor snapshot"
        );
        Ok(monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::instance::ReviewStatus;
    use crate::worker::signal::{AgentMessage, ContentBlock};
    use serde_json::json;

    fn tool_turn() -> Signal {
        Signal::Message {
            message: AgentMessage::AssistantTurn {
                content: vec![ContentBlock::ToolUse {
                    name: "bash".to_string(),
                    input: json!({"command": "cargo check"}),
                }],
            },
        }
    }

    #[tokio::test]
    async fn test_signal_without_state_change_still_refreshes_activity() {
        let start = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", start);

        let later = start + chrono::Duration::minutes(5);
        let narration = Signal::Message {
            message: AgentMessage::AssistantTurn {
                content: vec![ContentBlock::Text {
                    text: "Thinking about the approach.".to_string(),
                }],
            },
        };
        let event = monitor.ingest_signal(&id, &narration, later).await.unwrap();
        assert!(event.is_none());
        assert_eq!(monitor.get(&id).unwrap().last_activity, later);
        assert_eq!(monitor.get(&id).unwrap().state, WorkerState::Spawning);
    }

    #[tokio::test]
    async fn test_pr_metadata_recorded_with_milestone() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);

        // Walk to Working first
        {
            let worker = monitor.workers.get_mut(&id).unwrap();
            worker.state = WorkerState::Working;
        }
        let signal = Signal::RawOutput {
            text: "Opened https://github.com/org/repo/pull/88 for review".to_string(),
        };
        let event = monitor.ingest_signal(&id, &signal, now).await.unwrap().unwrap();
        assert_eq!(event.to, WorkerState::PrOpen);

        let worker = monitor.get(&id).unwrap();
        assert_eq!(worker.pr_number, Some(88));
        assert_eq!(
            worker.pr_url.as_deref(),
            Some("https://github.com/org/repo/pull/88")
        );
    }

    #[tokio::test]
    async fn test_rejected_pr_proposal_records_no_metadata() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);

        // PR URL surfaces while the worker is still Spawning: the detector
        // proposes PrOpen but the table has no such edge, so the proposal
        // is discarded and no PR metadata may stick
        let later = now + chrono::Duration::seconds(10);
        let signal = Signal::RawOutput {
            text: "replayed log: https://github.com/org/repo/pull/5".to_string(),
        };
        let event = monitor.ingest_signal(&id, &signal, later).await.unwrap();
        assert!(event.is_none());

        let worker = monitor.get(&id).unwrap();
        assert_eq!(worker.state, WorkerState::Spawning);
        assert_eq!(worker.pr_number, None);
        assert_eq!(worker.pr_url, None);
        assert_eq!(worker.review_status, ReviewStatus::None);
        assert_eq!(worker.last_activity, later);
    }

    #[tokio::test]
    async fn test_error_output_on_terminal_worker_leaves_record_unchanged() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);
        monitor.workers.get_mut(&id).unwrap().state = WorkerState::Stopped;

        let signal = Signal::RawOutput {
            text: "fatal error: container teardown raced shutdown".to_string(),
        };
        let event = monitor.ingest_signal(&id, &signal, now).await.unwrap();
        assert!(event.is_none());

        let worker = monitor.get(&id).unwrap();
        assert_eq!(worker.state, WorkerState::Stopped);
        assert!(worker.last_error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_worker_is_an_error() {
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let result = monitor.ingest_signal("nope", &tool_turn(), Utc::now()).await;
        assert!(matches!(result, Err(MonitorError::UnknownWorker { .. })));
    }

    #[tokio::test]
    async fn test_restart_moves_error_back_to_working_and_logs_agent() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);
        {
            let worker = monitor.workers.get_mut(&id).unwrap();
            worker.state = WorkerState::Error;
            worker.record_error("boom");
        }

        assert!(monitor.record_restart(&id, "opus", now).await.unwrap());
        let worker = monitor.get(&id).unwrap();
        assert_eq!(worker.state, WorkerState::Working);
        assert_eq!(worker.agents_run, vec!["sonnet", "opus"]);
        assert!(worker.last_error.is_none());
    }

    #[tokio::test]
    async fn test_restart_of_healthy_worker_is_a_no_op() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);
        assert!(!monitor.record_restart(&id, "opus", now).await.unwrap());
        assert_eq!(monitor.get(&id).unwrap().state, WorkerState::Spawning);
        assert_eq!(monitor.get(&id).unwrap().agents_run, vec!["sonnet"]);
    }

    #[tokio::test]
    async fn test_restart_does_not_hijack_reviewing_worker() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let id = monitor.spawn_worker("sonnet", now);
        // Reviewing has a legal edge to Working (changes requested), but
        // restart must still refuse it: restart is the Error remedy
        monitor.workers.get_mut(&id).unwrap().state = WorkerState::Reviewing;

        assert!(!monitor.record_restart(&id, "opus", now).await.unwrap());
        let worker = monitor.get(&id).unwrap();
        assert_eq!(worker.state, WorkerState::Reviewing);
        assert_eq!(worker.agents_run, vec!["sonnet"]);
    }

    #[tokio::test]
    async fn test_reap_removes_only_terminal_workers() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let done = monitor.spawn_worker("sonnet", now);
        let busy = monitor.spawn_worker("sonnet", now);
        monitor.workers.get_mut(&done).unwrap().state = WorkerState::Merged;
        monitor.workers.get_mut(&busy).unwrap().state = WorkerState::Working;

        let reaped = monitor.reap_terminal();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].id, done);
        assert!(monitor.get(&done).is_none());
        assert!(monitor.get(&busy).is_some());
    }

    #[tokio::test]
    async fn test_evaluate_all_flags_only_needy_workers() {
        let now = Utc::now();
        let mut monitor = WorkerMonitor::new(InterventionPolicy::default());
        let errored = monitor.spawn_worker("sonnet", now);
        let healthy = monitor.spawn_worker("sonnet", now);
        monitor.workers.get_mut(&errored).unwrap().state = WorkerState::Error;
        monitor.workers.get_mut(&healthy).unwrap().state = WorkerState::Working;

        let flagged = monitor.evaluate_all(now);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].0, errored);
        assert!(flagged[0].1.needed);
    }
}
