//! Conversation-scoped agent state.
//!
//! One `AgentState` per conversation, passed explicitly into and out of
//! every orchestrator call and persisted by the caller between turns —
//! there is no process-wide session singleton. Everything here is
//! serializable for exactly that reason.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;

/// Upper bound on consecutive retries of a failing action before the
/// error is surfaced and control returns to the user.
pub const MAX_RETRIES: u32 = 3;

/// Control states of the orchestrator. `HumanInput` is the only
/// suspension point returned to the caller; every other state runs
/// synchronously inside one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Upload,
    Eda,
    HumanInput,
    Execute,
    Undo,
    Export,
}

/// One checkpoint on the undo stack. Immutable once created; created
/// before any mutating code action, destroyed only by undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub description: String,
    pub snapshot: String,
}

/// Structured side-effect descriptor surfaced to the caller, at most once
/// per turn (chart request or executed script).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Handle of the original upload, never mutated after upload.
    pub raw_handle: Option<String>,
    /// Handle of the dataset currently being edited. `None` only before
    /// the first upload.
    pub work_handle: Option<String>,
    /// LIFO undo checkpoints, most recent last.
    pub undo_stack: Vec<UndoEntry>,
    pub control: ControlState,
    /// The instruction currently being processed.
    pub instruction: String,
    /// Last message visible to the user.
    pub message: String,
    /// Last structured error; re-injected into the next prompt while
    /// retrying.
    pub error: Option<AgentError>,
    pub export_filename: String,
    /// Consecutive failures of the current action; always 0 when control
    /// is back at `HumanInput`.
    pub retry_count: u32,
    /// Tool-call descriptor emitted this turn, if any.
    pub last_tool: Option<ToolCall>,
    /// Ordered conversation transcript; a trailing window of it goes into
    /// each prompt.
    pub transcript: Vec<ChatTurn>,
}

impl AgentState {
    pub fn new(export_filename: &str) -> Self {
        Self {
            raw_handle: None,
            work_handle: None,
            undo_stack: Vec::new(),
            control: ControlState::Upload,
            instruction: String::new(),
            message: String::new(),
            error: None,
            export_filename: export_filename.to_string(),
            retry_count: 0,
            last_tool: None,
            transcript: Vec::new(),
        }
    }

    pub fn push_turn(&mut self, role: &str, text: &str) {
        self.transcript.push(ChatTurn {
            role: role.to_string(),
            text: text.to_string(),
        });
    }
}
