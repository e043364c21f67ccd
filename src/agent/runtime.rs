//! The agent orchestrator — core of dataloom.
//!
//! Runs one bounded transition loop per conversation turn: classify the
//! instruction, then move through the control states until the turn
//! suspends at `HumanInput`. All error kinds are caught at the action
//! boundary and become either a renewed execute attempt or a terminal
//! message; none escape the loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{error, info, warn};

use crate::agent::prompt::{self, ModelAction};
use crate::agent::state::{AgentState, ControlState, ToolCall, MAX_RETRIES};
use crate::cache::PromptCache;
use crate::config::Config;
use crate::diff;
use crate::error::AgentError;
use crate::executor::{validator, SandboxedExecutor};
use crate::llm::LlmClient;
use crate::store::TableStore;
use crate::table::Table;

/// Hard ceiling on transitions per turn; guarantees termination even if a
/// bug wires two states into a loop.
const MAX_ITERATIONS: usize = 20;

/// Undo descriptions keep this much of the script.
const UNDO_DESCRIPTION_LEN: usize = 60;

pub struct AgentRuntime {
    config: Config,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn TableStore>,
    cache: PromptCache,
    executor: SandboxedExecutor,
}

impl AgentRuntime {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, store: Arc<dyn TableStore>) -> Self {
        let cache = PromptCache::new(Duration::from_secs(config.cache.ttl_seconds));
        let executor = SandboxedExecutor::new(config.executor.clone());
        Self {
            config,
            llm,
            store,
            cache,
            executor,
        }
    }

    /// Fresh conversation state with the configured export default.
    pub fn new_session(&self) -> AgentState {
        AgentState::new(&self.config.agent.export_filename)
    }

    /// Ingests an uploaded CSV: sets the raw and working handles, emits a
    /// row/column summary, then forwards through EDA back to the user.
    /// Upload failures are reported, never fatal.
    pub async fn upload(&self, mut state: AgentState, content: &[u8]) -> AgentState {
        info!("Processing file upload ({} bytes)", content.len());
        state.last_tool = None;

        match self.ingest(content) {
            Ok((handle, rows, cols)) => {
                state.raw_handle = Some(handle.clone());
                state.work_handle = Some(handle);
                state.message = format!("Loaded {rows} rows × {cols} columns");
                state.control = ControlState::Eda;
            }
            Err(e) => {
                error!("Upload failed: {e:#}");
                let err = AgentError::Operational(format!("Upload failed: {e}"));
                state.message = err.to_string();
                state.error = Some(err);
                state.control = ControlState::HumanInput;
            }
        }

        self.run_cycle(state).await
    }

    fn ingest(&self, content: &[u8]) -> anyhow::Result<(String, usize, usize)> {
        let table = Table::from_csv(content)?;
        let (rows, cols) = table.shape();
        let handle = self.store.write(&table)?;
        Ok((handle, rows, cols))
    }

    /// Processes one instruction: one complete turn from classification to
    /// the next `HumanInput` suspension. The caller persists the returned
    /// state and must serialize turns per conversation.
    pub async fn accept(&self, mut state: AgentState, instruction: &str) -> AgentState {
        info!("Processing instruction: {instruction}");
        state.last_tool = None;
        state.instruction = instruction.to_string();
        state.push_turn("user", instruction);
        state.control = classify(instruction, &mut state);

        let mut state = self.run_cycle(state).await;

        let message = state.message.clone();
        state.push_turn("assistant", &message);
        state
    }

    /// Transition loop: runs until the turn suspends or hits the ceiling.
    async fn run_cycle(&self, mut state: AgentState) -> AgentState {
        let mut safety = 0;
        while state.control != ControlState::HumanInput && safety < MAX_ITERATIONS {
            state = match state.control {
                ControlState::Execute => self.execute(state).await,
                ControlState::Eda => eda(state),
                ControlState::Undo => self.undo(state),
                ControlState::Export => self.export(state),
                // Upload is entered via `upload()`, not the loop
                ControlState::Upload | ControlState::HumanInput => break,
            };
            safety += 1;
        }

        if safety >= MAX_ITERATIONS {
            warn!("Turn hit the {MAX_ITERATIONS} transition ceiling");
        }
        if state.control == ControlState::HumanInput {
            state.retry_count = 0;
        }
        state
    }

    // ── EXECUTE ──────────────────────────────────────────

    async fn execute(&self, mut state: AgentState) -> AgentState {
        let table = state
            .work_handle
            .as_ref()
            .and_then(|h| self.store.read(h).ok());
        let prompt = prompt::build(&state, table.as_ref(), self.config.agent.history_window);

        // Cache lookup strictly precedes the completion call
        let key = PromptCache::key(&prompt);
        let cached = if self.config.cache.enabled {
            self.cache.get(&key)
        } else {
            None
        };

        let raw = match cached {
            Some(text) => {
                info!("Using cached LLM response");
                text
            }
            None => match self.llm.complete(&prompt).await {
                Ok(text) => {
                    if self.config.cache.enabled {
                        self.cache.set(key, text.clone(), None);
                    }
                    text
                }
                Err(e) => return self.model_failure(state, &e),
            },
        };

        match prompt::parse_response(&raw) {
            Err(err) => self.action_failure(state, err),
            Ok(ModelAction::Answer { content }) | Ok(ModelAction::Clarify { content }) => {
                state.message = content;
                state.error = None;
                state.retry_count = 0;
                state.control = ControlState::HumanInput;
                state
            }
            Ok(ModelAction::Visualize {
                title,
                chart_type,
                x_axis_key,
                y_axis_key,
            }) => {
                state.last_tool = Some(ToolCall {
                    name: "generateVisualization".to_string(),
                    args: json!({
                        "title": title,
                        "type": chart_type,
                        "xAxisKey": x_axis_key,
                        "yAxisKey": y_axis_key,
                    }),
                });
                state.message = "Generating visualization...".to_string();
                state.control = ControlState::Eda;
                state
            }
            Ok(ModelAction::Code {
                content,
                explanation,
            }) => self.run_code(state, &content, &explanation).await,
        }
    }

    async fn run_code(
        &self,
        mut state: AgentState,
        code: &str,
        explanation: &str,
    ) -> AgentState {
        state.last_tool = Some(ToolCall {
            name: "runAnalysisScript".to_string(),
            args: json!({ "script": code, "explanation": explanation }),
        });

        let Some(handle) = state.work_handle.clone() else {
            return self.action_failure(
                state,
                AgentError::Execution("No dataset loaded; upload a file first".to_string()),
            );
        };

        // Snapshot before any mutating action, so undo always has a
        // checkpoint even if this execution goes sideways later.
        let description = format!("Code: {}...", truncate(code, UNDO_DESCRIPTION_LEN));
        if let Err(e) = state.push_snapshot(self.store.as_ref(), &description) {
            return self.action_failure(
                state,
                AgentError::Execution(format!("snapshot failed: {e}")),
            );
        }

        if let Err(reason) = validator::validate(code, self.config.executor.max_code_length) {
            warn!("Code validation failed: {reason}");
            return self.action_failure(state, AgentError::Validation(reason));
        }

        let before = match self.store.read(&handle) {
            Ok(table) => table,
            Err(e) => {
                return self.action_failure(
                    state,
                    AgentError::Execution(format!("cannot load working table: {e}")),
                )
            }
        };

        let result = self.executor.run(code, &before).await;

        if let Some(err) = result.error {
            // Working handle untouched on every failure path
            return self.action_failure(state, AgentError::Execution(err));
        }

        let Some(after) = result.table else {
            return self.action_failure(
                state,
                AgentError::Execution("executor returned neither table nor error".to_string()),
            );
        };

        let new_handle = match self.store.write(&after) {
            Ok(handle) => handle,
            Err(e) => {
                return self.action_failure(
                    state,
                    AgentError::Execution(format!("cannot store result table: {e}")),
                )
            }
        };

        let changes = diff::compare(Some(&before), &after);
        let mut message = "✅ Code executed successfully".to_string();
        if !changes.is_empty() {
            message.push_str(&format!("\n\n### Data Changes\n{}", changes.join("\n\n")));
        }
        if !result.stdout.is_empty() {
            message.push_str(&format!("\n\n**Output:**\n```\n{}\n```", result.stdout));
        }

        state.work_handle = Some(new_handle);
        state.message = message;
        state.error = None;
        state.retry_count = 0;
        state.control = ControlState::Eda;
        state
    }

    /// Validation/execution failures: bounded retry with the error
    /// re-injected into the next prompt, then surfaced.
    fn action_failure(&self, mut state: AgentState, err: AgentError) -> AgentState {
        error!("Action failed: {err}");
        state.error = Some(err.clone());
        state.retry_count += 1;
        if state.retry_count < MAX_RETRIES {
            state.control = ControlState::Execute;
        } else {
            state.message = err.to_string();
            state.retry_count = 0;
            state.control = ControlState::HumanInput;
        }
        state
    }

    /// Completion-call failures: same bounded retry, but the exhausted
    /// message points at connectivity/configuration, not the request.
    fn model_failure(&self, mut state: AgentState, e: &anyhow::Error) -> AgentState {
        error!("LLM call failed: {e:#}");
        state.error = Some(AgentError::Model(e.to_string()));
        state.retry_count += 1;
        if state.retry_count < MAX_RETRIES {
            state.message = format!("Connecting to AI... (Retry {})", state.retry_count);
            state.control = ControlState::Execute;
        } else {
            state.message = format!(
                "AI connection failed: {e}. Check network connectivity and API configuration."
            );
            state.retry_count = 0;
            state.control = ControlState::HumanInput;
        }
        state
    }

    // ── UNDO / EXPORT ────────────────────────────────────

    fn undo(&self, mut state: AgentState) -> AgentState {
        info!("Undo operation");
        match state.pop_snapshot() {
            Some(entry) => {
                state.work_handle = Some(entry.snapshot);
                state.message = format!("Undid: {}", entry.description);
            }
            None => {
                // Informational, never fatal, never retried
                state.message = "Nothing to undo.".to_string();
            }
        }
        state.control = ControlState::Eda;
        state
    }

    fn export(&self, mut state: AgentState) -> AgentState {
        info!("Exporting to {}", state.export_filename);
        match self.write_export(&state) {
            Ok(()) => {
                state.message = format!("✅ Saved {}", state.export_filename);
            }
            Err(e) => {
                error!("Export failed: {e:#}");
                state.message = AgentError::Operational(format!("Export failed: {e}")).to_string();
            }
        }
        state.control = ControlState::HumanInput;
        state
    }

    fn write_export(&self, state: &AgentState) -> anyhow::Result<()> {
        let handle = state
            .work_handle
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no dataset loaded"))?;
        let table = self.store.read(handle)?;
        std::fs::write(&state.export_filename, table.to_csv()?)?;
        Ok(())
    }
}

/// EDA: no-op forwarding back to the suspension point.
fn eda(mut state: AgentState) -> AgentState {
    state.control = ControlState::HumanInput;
    state
}

/// Instruction classification, performed before anything runs: undo and
/// export are intercepted here and never reach the LLM.
fn classify(instruction: &str, state: &mut AgentState) -> ControlState {
    let trimmed = instruction.trim();
    let lowered = trimmed.to_lowercase();

    if lowered == "undo" || lowered == "/undo" {
        return ControlState::Undo;
    }
    if lowered == "/export" || lowered.starts_with("/export ") {
        if let Some(name) = trimmed.splitn(2, ' ').nth(1) {
            let name = name.trim();
            if !name.is_empty() {
                state.export_filename = name.to_string();
            }
        }
        return ControlState::Export;
    }
    ControlState::Execute
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DiskStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// LLM double that replays a fixed list of outcomes and counts calls.
    struct ScriptedLlm {
        responses: Mutex<Vec<Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("scripted LLM exhausted"));
            }
            responses.remove(0).map_err(|e| anyhow!(e))
        }

        fn description(&self) -> String {
            "scripted (test)".to_string()
        }
    }

    fn test_config(dir: &std::path::Path, exec_timeout: u64) -> Config {
        let toml = format!(
            r#"
[llm]
provider = "test"
model = "scripted"
api_key = "none"

[executor]
timeout_seconds = {exec_timeout}

[storage]
path = "{}"
"#,
            dir.display()
        );
        toml::from_str(&toml).unwrap()
    }

    fn runtime_with(
        dir: &tempfile::TempDir,
        responses: Vec<Result<String, String>>,
        exec_timeout: u64,
    ) -> (AgentRuntime, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(responses));
        let store = Arc::new(DiskStore::open(dir.path()).unwrap());
        let runtime = AgentRuntime::new(test_config(dir.path(), exec_timeout), llm.clone(), store);
        (runtime, llm)
    }

    async fn uploaded(runtime: &AgentRuntime) -> AgentState {
        let state = runtime.new_session();
        let state = runtime.upload(state, b"value\n10\n20\n30\n").await;
        assert_eq!(state.control, ControlState::HumanInput);
        state
    }

    fn code_response(script: &str) -> Result<String, String> {
        Ok(format!(
            r#"{{"action": "code", "content": {}, "explanation": "test"}}"#,
            serde_json::Value::from(script)
        ))
    }

    #[tokio::test]
    async fn test_upload_sets_handles_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![], 5);

        let state = uploaded(&runtime).await;
        assert!(state.raw_handle.is_some());
        assert_eq!(state.raw_handle, state.work_handle);
        assert_eq!(state.message, "Loaded 3 rows × 1 columns");
        assert_eq!(state.retry_count, 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![], 5);

        let state = runtime
            .upload(runtime.new_session(), b"a,b\n\"broken,1\n1,2,3\n")
            .await;
        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("Upload failed"));
        assert!(state.work_handle.is_none());
    }

    #[tokio::test]
    async fn test_answer_action() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, llm) = runtime_with(
            &dir,
            vec![Ok(r#"{"action": "answer", "content": "The mean is 20."}"#.into())],
            5,
        );

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "what is the mean?").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert_eq!(state.message, "The mean is 20.");
        assert_eq!(state.retry_count, 0);
        assert!(state.error.is_none());
        assert_eq!(llm.calls(), 1);
        // user turn + assistant turn
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[1].text, "The mean is 20.");
    }

    #[tokio::test]
    async fn test_unparseable_completion_is_answer_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![Ok("probably around 20".into())], 5);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "guess the mean").await;
        assert_eq!(state.message, "probably around 20");
        assert_eq!(state.control, ControlState::HumanInput);
    }

    #[tokio::test]
    async fn test_code_success_commits_diff_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![code_response("value = value * 2")], 10);

        let state = uploaded(&runtime).await;
        let before = state.work_handle.clone().unwrap();
        let state = runtime.accept(state, "double the values").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("✅ Code executed successfully"));
        assert!(state.message.contains("Values changed: 3 cells modified."));
        assert!(state.error.is_none());
        assert_ne!(state.work_handle.clone().unwrap(), before);

        // Snapshot created before the mutation
        assert_eq!(state.undo_stack.len(), 1);
        assert!(state.undo_stack[0].description.starts_with("Code: value = value * 2"));

        let tool = state.last_tool.as_ref().unwrap();
        assert_eq!(tool.name, "runAnalysisScript");
        assert_eq!(tool.args["script"], "value = value * 2");
    }

    #[tokio::test]
    async fn test_validation_rejection_retries_then_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            code_response("import os"),
            code_response("import os"),
            code_response("import os"),
        ];
        let (runtime, llm) = runtime_with(&dir, responses, 5);

        let state = uploaded(&runtime).await;
        let before = state.work_handle.clone().unwrap();
        let state = runtime.accept(state, "list files").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("OS module access is not allowed"));
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.work_handle.unwrap(), before);
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_execution_timeout_leaves_handle_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            code_response("while True:\n    pass"),
            code_response("while True:\n    pass"),
            code_response("while True:\n    pass"),
        ];
        let (runtime, _) = runtime_with(&dir, responses, 1);

        let state = uploaded(&runtime).await;
        let before = state.work_handle.clone().unwrap();
        let state = runtime.accept(state, "hang forever").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("timed out"));
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.work_handle.unwrap(), before);
    }

    #[tokio::test]
    async fn test_model_failure_names_connectivity_after_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
        ];
        let (runtime, llm) = runtime_with(&dir, responses, 5);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "anything").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("AI connection failed"));
        assert!(state.message.contains("connectivity"));
        assert_eq!(state.retry_count, 0);
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers_when_model_fixes_the_code() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            code_response("value = value * nope"),
            code_response("value = value * 2"),
        ];
        let (runtime, llm) = runtime_with(&dir, responses, 10);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "double the values").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.contains("✅"));
        assert_eq!(state.retry_count, 0);
        assert_eq!(llm.calls(), 2);
        // Both attempts snapshotted before running
        assert_eq!(state.undo_stack.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_action_takes_retry_path() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            Ok(r#"{"action": "dance"}"#.to_string()),
            Ok(r#"{"action": "dance"}"#.to_string()),
            Ok(r#"{"action": "dance"}"#.to_string()),
        ];
        let (runtime, llm) = runtime_with(&dir, responses, 5);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "do something").await;

        assert!(state.message.contains("Unknown action: dance"));
        assert_eq!(state.retry_count, 0);
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_visualize_emits_tool_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(
            &dir,
            vec![Ok(
                r#"{"action": "visualize", "title": "Values", "type": "line", "xAxisKey": "value", "yAxisKey": "value"}"#
                    .into(),
            )],
            5,
        );

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "plot it").await;

        assert_eq!(state.control, ControlState::HumanInput);
        assert_eq!(state.message, "Generating visualization...");
        let tool = state.last_tool.unwrap();
        assert_eq!(tool.name, "generateVisualization");
        assert_eq!(tool.args["type"], "line");
        assert_eq!(tool.args["xAxisKey"], "value");
    }

    #[tokio::test]
    async fn test_tool_descriptor_cleared_each_turn() {
        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            Ok(r#"{"action": "visualize", "xAxisKey": "value"}"#.into()),
            Ok(r#"{"action": "answer", "content": "done"}"#.into()),
        ];
        let (runtime, _) = runtime_with(&dir, responses, 5);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "plot it").await;
        assert!(state.last_tool.is_some());
        let state = runtime.accept(state, "thanks").await;
        assert!(state.last_tool.is_none());
    }

    #[tokio::test]
    async fn test_undo_restores_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![code_response("value = value * 2")], 10);

        let state = uploaded(&runtime).await;
        let original = runtime
            .store
            .read(state.work_handle.as_ref().unwrap())
            .unwrap();

        let state = runtime.accept(state, "double the values").await;
        assert_eq!(state.undo_stack.len(), 1);

        let state = runtime.accept(state, "undo").await;
        assert_eq!(state.control, ControlState::HumanInput);
        assert!(state.message.starts_with("Undid: Code: value = value * 2"));
        assert!(state.undo_stack.is_empty());

        let restored = runtime
            .store
            .read(state.work_handle.as_ref().unwrap())
            .unwrap();
        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn test_undo_on_empty_stack_is_informational() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, llm) = runtime_with(&dir, vec![], 5);

        let state = uploaded(&runtime).await;
        let state = runtime.accept(state, "/undo").await;

        assert_eq!(state.message, "Nothing to undo.");
        assert_eq!(state.control, ControlState::HumanInput);
        // Never reaches the LLM
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, llm) = runtime_with(&dir, vec![], 5);
        let target = dir.path().join("out.csv");

        let state = uploaded(&runtime).await;
        let state = runtime
            .accept(state, &format!("/export {}", target.display()))
            .await;

        assert!(state.message.contains("✅ Saved"));
        assert_eq!(state.export_filename, target.display().to_string());
        assert_eq!(llm.calls(), 0);

        let written = std::fs::read(&target).unwrap();
        let table = Table::from_csv(&written).unwrap();
        assert_eq!(table.shape(), (3, 1));
    }

    #[tokio::test]
    async fn test_export_failure_is_caught() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = runtime_with(&dir, vec![], 5);

        let state = uploaded(&runtime).await;
        let state = runtime
            .accept(state, "/export /nonexistent-dir/out.csv")
            .await;

        assert!(state.message.contains("Export failed"));
        assert_eq!(state.control, ControlState::HumanInput);
    }

    #[test]
    fn test_classify_export_without_name_keeps_default() {
        let mut state = AgentState::new("cleaned.csv");
        assert_eq!(classify("/export", &mut state), ControlState::Export);
        assert_eq!(state.export_filename, "cleaned.csv");

        assert_eq!(classify("/export out.csv", &mut state), ControlState::Export);
        assert_eq!(state.export_filename, "out.csv");
    }

    #[test]
    fn test_classify_undo_variants() {
        let mut state = AgentState::new("cleaned.csv");
        assert_eq!(classify("undo", &mut state), ControlState::Undo);
        assert_eq!(classify("/undo", &mut state), ControlState::Undo);
        assert_eq!(classify("Undo", &mut state), ControlState::Undo);
        assert_eq!(classify("undo the last step", &mut state), ControlState::Execute);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
