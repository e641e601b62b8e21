// Worker state detection from agent signals
//
// Both detectors are pure and total: they map (signal, current state) to an
// optional proposed next state and never fail. Checks run in a fixed
// priority order (error, then terminal success, then forward progress),
// short-circuiting at the first match so each rule stays independently
// testable. Plain narration text never moves state.

use std::sync::LazyLock;

use regex::Regex;

use crate::worker::signal::AgentMessage;
use crate::worker::state::WorkerState;

static PR_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[\w.-]+/[\w.-]+/pull/(\d+)").expect("PR URL pattern is valid")
});

/// Phrases in raw output that indicate an agent- or API-level failure.
const ERROR_PHRASES: &[&str] = &["api error", "agent error", "fatal error"];

/// Phrases in raw output that indicate the PR landed.
const MERGE_PHRASES: &[&str] = &["merge succeeded", "successfully merged", "pull request merged"];

/// Phrases that show the agent has started touching the workspace. Only
/// trusted as a first sign of life out of Initializing.
const ACTIVITY_PHRASES: &[&str] = &[
    "creating file",
    "editing file",
    "writing file",
    "running command",
    "executing command",
];

/// Infer a state change from a structured agent message.
///
/// Returns None when the message warrants no change; a result-level error
/// flag always wins over any other evidence in the same message.
pub fn detect_state_from_message(
    message: &AgentMessage,
    current: WorkerState,
) -> Option<WorkerState> {
    // An API/agent-level failure takes priority over everything else
    if let AgentMessage::TurnResult { is_error: true, .. } = message {
        return Some(WorkerState::Error);
    }

    // Tool invocations mean the agent is acting, not merely reasoning
    if message.has_tool_use() && current.precedes(WorkerState::Working) {
        return Some(WorkerState::Working);
    }

    // A PR URL in turn text marks the PR_OPEN milestone, but only on the
    // way there: re-mentions after the fact must not re-trigger it
    if current.precedes(WorkerState::PrOpen) && PR_URL_RE.is_match(&message.text_content()) {
        return Some(WorkerState::PrOpen);
    }

    None
}

/// Infer a state change from raw captured process output.
///
/// Fallback channel for workers whose structured stream is unavailable;
/// applies the same heuristics via substring and pattern matching.
pub fn detect_state_from_output(text: &str, current: WorkerState) -> Option<WorkerState> {
    let lowered = text.to_lowercase();

    if ERROR_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(WorkerState::Error);
    }

    if MERGE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(WorkerState::Merged);
    }

    if current.precedes(WorkerState::PrOpen) && PR_URL_RE.is_match(text) {
        return Some(WorkerState::PrOpen);
    }

    // First sign of life after spawn: workspace activity phrasing
    if current == WorkerState::Initializing && ACTIVITY_PHRASES.iter().any(|p| lowered.contains(p))
    {
        return Some(WorkerState::Working);
    }

    None
}

/// Extract the first PR URL and number from text, if any.
pub fn extract_pr_reference(text: &str) -> Option<(String, u64)> {
    let captures = PR_URL_RE.captures(text)?;
    let url = captures.get(0)?.as_str().to_string();
    let number = captures.get(1)?.as_str().parse().ok()?;
    Some((url, number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::signal::ContentBlock;
    use serde_json::json;

    fn turn(blocks: Vec<ContentBlock>) -> AgentMessage {
        AgentMessage::AssistantTurn { content: blocks }
    }

    fn text_block(text: &str) -> ContentBlock {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }

    fn tool_block() -> ContentBlock {
        ContentBlock::ToolUse {
            name: "bash".to_string(),
            input: json!({"command": "ls"}),
        }
    }

    #[test]
    fn test_tool_use_infers_working_from_initializing() {
        let msg = turn(vec![tool_block()]);
        assert_eq!(
            detect_state_from_message(&msg, WorkerState::Initializing),
            Some(WorkerState::Working)
        );
    }

    #[test]
    fn test_tool_use_is_ignored_once_already_working() {
        let msg = turn(vec![tool_block()]);
        assert_eq!(detect_state_from_message(&msg, WorkerState::Working), None);
        assert_eq!(detect_state_from_message(&msg, WorkerState::Reviewing), None);
    }

    #[test]
    fn test_pr_url_in_turn_text_infers_pr_open() {
        let msg = turn(vec![text_block(
            "Created https://github.com/org/repo/pull/123",
        )]);
        assert_eq!(
            detect_state_from_message(&msg, WorkerState::Working),
            Some(WorkerState::PrOpen)
        );
    }

    #[test]
    fn test_pr_url_does_not_retrigger_past_pr_open() {
        let msg = turn(vec![text_block(
            "As noted, https://github.com/org/repo/pull/123 is up",
        )]);
        assert_eq!(detect_state_from_message(&msg, WorkerState::PrOpen), None);
        assert_eq!(detect_state_from_message(&msg, WorkerState::Reviewing), None);
    }

    #[test]
    fn test_result_error_flag_always_infers_error() {
        let msg = AgentMessage::TurnResult {
            is_error: true,
            num_turns: 3,
            total_cost_usd: 0.42,
        };
        for state in [
            WorkerState::Working,
            WorkerState::PrOpen,
            WorkerState::Merging,
        ] {
            assert_eq!(
                detect_state_from_message(&msg, state),
                Some(WorkerState::Error)
            );
        }
    }

    #[test]
    fn test_clean_result_warrants_no_change() {
        let msg = AgentMessage::TurnResult {
            is_error: false,
            num_turns: 7,
            total_cost_usd: 1.1,
        };
        assert_eq!(detect_state_from_message(&msg, WorkerState::Working), None);
    }

    #[test]
    fn test_plain_narration_never_moves_state() {
        let msg = turn(vec![text_block("I will refactor the parser next.")]);
        assert_eq!(detect_state_from_message(&msg, WorkerState::Working), None);
        assert_eq!(
            detect_state_from_message(&msg, WorkerState::Initializing),
            None
        );
    }

    #[test]
    fn test_output_pr_url_infers_pr_open_only_before_milestone() {
        let text = "PR https://github.com/org/repo/pull/123 is ready";
        assert_eq!(
            detect_state_from_output(text, WorkerState::Working),
            Some(WorkerState::PrOpen)
        );
        // Re-scanning output that still carries the URL must be idempotent
        assert_eq!(detect_state_from_output(text, WorkerState::PrOpen), None);
        assert_eq!(detect_state_from_output(text, WorkerState::Reviewing), None);
    }

    #[test]
    fn test_output_merge_phrase_infers_merged() {
        assert_eq!(
            detect_state_from_output("Merge succeeded, branch deleted", WorkerState::Merging),
            Some(WorkerState::Merged)
        );
    }

    #[test]
    fn test_output_error_phrase_wins_over_pr_url() {
        let text = "API error while pushing https://github.com/org/repo/pull/9";
        assert_eq!(
            detect_state_from_output(text, WorkerState::Working),
            Some(WorkerState::Error)
        );
    }

    #[test]
    fn test_output_activity_phrase_only_lifts_initializing() {
        assert_eq!(
            detect_state_from_output("editing file src/main.rs", WorkerState::Initializing),
            Some(WorkerState::Working)
        );
        assert_eq!(
            detect_state_from_output("editing file src/main.rs", WorkerState::Working),
            None
        );
        assert_eq!(
            detect_state_from_output("editing file src/main.rs", WorkerState::Spawning),
            None
        );
    }

    #[test]
    fn test_output_with_no_match_is_no_op() {
        assert_eq!(
            detect_state_from_output("compiling foreman v0.1.0", WorkerState::Working),
            None
        );
    }

    #[test]
    fn test_extract_pr_reference() {
        assert_eq!(
            extract_pr_reference("see https://github.com/org/repo/pull/456 please"),
            Some(("https://github.com/org/repo/pull/456".to_string(), 456))
        );
        assert_eq!(extract_pr_reference("no links here"), None);
    }
}
