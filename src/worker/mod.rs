// Worker lifecycle core: state model, signal detectors, transition
// validation, intervention policy, and presentation metadata.

pub mod detector;
pub mod instance;
pub mod intervention;
pub mod presentation;
pub mod signal;
pub mod state;
pub mod transition;

pub use detector::{detect_state_from_message, detect_state_from_output, extract_pr_reference};
pub use instance::{ReviewStatus, WorkerInstance};
pub use intervention::{InterventionAction, InterventionDecision, InterventionPolicy};
pub use presentation::{available_actions, state_description, state_emoji, WorkerAction};
pub use signal::{AgentMessage, ContentBlock, Signal};
pub use state::{is_terminal_state, is_valid_transition, WorkerState};
pub use transition::{apply_if_valid, TransitionEvent};
