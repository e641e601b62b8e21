// Transition observation seam
//
// Accepted transitions fan out to observers for durable history. The
// monitor never gates acceptance on an observer: a failing history sink
// must not stall a worker's lifecycle.

use async_trait::async_trait;
use tracing::info;

use crate::worker::transition::TransitionEvent;

/// Receives every accepted state transition.
#[async_trait]
pub trait TransitionObserver: Send + Sync {
    async fn on_transition(&self, event: &TransitionEvent);
}

/// Default observer: structured log line per transition.
pub struct LoggingObserver;

#[async_trait]
impl TransitionObserver for LoggingObserver {
    async fn on_transition(&self, event: &TransitionEvent) {
        info!(
            worker_id = %event.worker_id,
            from = ?event.from,
            to = ?event.to,
            occurred_at = %event.occurred_at,
            "Observed worker transition"
        );
    }
}
