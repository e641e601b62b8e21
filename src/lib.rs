// Foreman Library - Worker Lifecycle Orchestration
// This exposes the lifecycle core for testing and integration

pub mod cli;
pub mod config;
pub mod monitor;
pub mod observation;
pub mod telemetry;
pub mod worker;

// Re-export key types for easy access
pub use config::ForemanConfig;
pub use monitor::{MonitorError, MonitorSnapshot, WorkerMonitor};
pub use observation::{LoggingObserver, TransitionObserver};
pub use worker::{
    apply_if_valid, available_actions, detect_state_from_message, detect_state_from_output,
    is_terminal_state, is_valid_transition, state_description, state_emoji, AgentMessage,
    ContentBlock, InterventionAction, InterventionDecision, InterventionPolicy, ReviewStatus,
    Signal, TransitionEvent, WorkerAction, WorkerInstance, WorkerState,
};
