// Signal shapes arriving from agent processes
//
// Workers report through two channels: a structured JSON event stream from
// the agent harness, and raw captured terminal output as a fallback when
// the stream is unavailable. Both feed the detectors in src/worker/detector.rs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One block of an assistant turn: either free text or a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Free-form reasoning or narration text
    Text { text: String },
    /// The agent invoked a tool (file edit, shell command, ...)
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
}

impl ContentBlock {
    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentBlock::ToolUse { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::ToolUse { .. } => None,
        }
    }
}

/// A structured message from the agent process stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// One assistant turn: an ordered list of content blocks
    AssistantTurn { content: Vec<ContentBlock> },
    /// End-of-turn result with error flag and run metadata
    TurnResult {
        is_error: bool,
        #[serde(default)]
        num_turns: u32,
        #[serde(default)]
        total_cost_usd: f64,
    },
}

impl AgentMessage {
    /// Decode one line of the agent's JSON event stream.
    ///
    /// Unrecognized or malformed shapes yield None rather than an error: a
    /// single garbled message must not abort monitoring of an otherwise
    /// healthy worker.
    pub fn from_json_line(line: &str) -> Option<AgentMessage> {
        serde_json::from_str(line.trim()).ok()
    }

    /// All text content of an assistant turn, joined with newlines.
    pub fn text_content(&self) -> String {
        match self {
            AgentMessage::AssistantTurn { content } => content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            AgentMessage::TurnResult { .. } => String::new(),
        }
    }

    /// True when an assistant turn contains at least one tool invocation.
    pub fn has_tool_use(&self) -> bool {
        match self {
            AgentMessage::AssistantTurn { content } => {
                content.iter().any(ContentBlock::is_tool_use)
            }
            AgentMessage::TurnResult { .. } => false,
        }
    }
}

/// A signal as delivered to the monitor: either a decoded structured
/// message or a block of raw captured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    Message { message: AgentMessage },
    RawOutput { text: String },
}
