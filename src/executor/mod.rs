//! Sandboxed executor: supervised worker process for submitted scripts.
//!
//! The worker is a separate OS process running an embedded, stdlib-only
//! runner program, so a hang or crash inside submitted code can never block
//! or corrupt the orchestrator. The supervisor writes one JSON request to
//! the worker's stdin and reads one JSON response from its stdout — that
//! pipe is the only channel the table ever crosses, populated at most once.
//!
//! Exit paths and their guarantees:
//! - success: response parsed, new table returned
//! - timeout: worker killed and reaped, timeout error, input table untouched
//! - crash (nonzero exit, garbled response, spawn failure): error carrying
//!   the fault category, input table untouched
//!
//! `kill_on_drop` backstops reclamation if the supervisor future is dropped
//! mid-wait.

pub mod validator;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::table::Table;

/// Worker program source, shipped inside the binary.
const RUNNER: &str = include_str!("runner.py");

/// Outcome of one execution. Exactly one of `table`/`error` is populated;
/// the constructors are the only way to build one.
#[derive(Debug)]
pub struct ExecutionResult {
    pub table: Option<Table>,
    pub error: Option<String>,
    /// Captured print output; best-effort (may be empty) on timeout.
    pub stdout: String,
}

impl ExecutionResult {
    fn success(table: Table, stdout: String) -> Self {
        Self {
            table: Some(table),
            error: None,
            stdout,
        }
    }

    fn failure(error: String, stdout: String) -> Self {
        Self {
            table: None,
            error: Some(error),
            stdout,
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Serialize)]
struct WorkerRequest<'a> {
    code: &'a str,
    table: &'a Table,
}

#[derive(Deserialize)]
struct WorkerResponse {
    ok: Option<WorkerSuccess>,
    err: Option<WorkerFailure>,
}

#[derive(Deserialize)]
struct WorkerSuccess {
    table: Table,
    stdout: String,
}

#[derive(Deserialize)]
struct WorkerFailure {
    kind: String,
    message: String,
    stdout: String,
}

pub struct SandboxedExecutor {
    config: ExecutorConfig,
}

impl SandboxedExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Runs validated code against a private copy of `table`. Never
    /// returns `Err` for faults inside the worker — those become an
    /// `ExecutionResult` with the error populated.
    pub async fn run(&self, code: &str, table: &Table) -> ExecutionResult {
        match self.supervise(code, table).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failure(format!("worker supervision failed: {e:#}"), String::new()),
        }
    }

    async fn supervise(&self, code: &str, table: &Table) -> Result<ExecutionResult> {
        let request =
            serde_json::to_vec(&WorkerRequest { code, table }).context("encoding worker request")?;

        debug!(
            "Spawning worker ({}) for a {} char script",
            self.config.interpreter,
            code.len()
        );

        let mut child = match Command::new(&self.config.interpreter)
            .arg("-c")
            .arg(RUNNER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return Ok(ExecutionResult::failure(
                    format!("failed to start worker '{}': {e}", self.config.interpreter),
                    String::new(),
                ));
            }
        };

        // Delivered concurrently so the wall-clock budget below also covers
        // a worker that never reads its stdin; killing the worker closes the
        // pipe and unblocks the writer. A write error is not fatal, the exit
        // status carries the real failure.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(&request).await;
                let _ = stdin.shutdown().await;
            });
        }

        let mut stdout_pipe = child.stdout.take().context("worker stdout not piped")?;
        let mut stderr_pipe = child.stderr.take().context("worker stderr not piped")?;
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let status = match timeout(self.config.timeout(), child.wait()).await {
            Ok(status) => status.context("waiting for worker")?,
            Err(_) => {
                warn!(
                    "Worker exceeded {}s budget, killing",
                    self.config.timeout_seconds
                );
                let _ = child.start_kill();
                let _ = child.wait().await;
                // Drain the pipes so the tasks finish; the result channel
                // was never populated, so captured output is best-effort.
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return Ok(ExecutionResult::failure(
                    format!(
                        "Code execution timed out after {}s",
                        self.config.timeout_seconds
                    ),
                    String::new(),
                ));
            }
        };

        let stdout_bytes = stdout_task.await.unwrap_or_default();
        let stderr_bytes = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr_tail = tail(&String::from_utf8_lossy(&stderr_bytes), 500);
            return Ok(ExecutionResult::failure(
                format!("worker crashed ({status}): {stderr_tail}"),
                String::new(),
            ));
        }

        let response: WorkerResponse = match serde_json::from_slice(&stdout_bytes) {
            Ok(response) => response,
            Err(e) => {
                let snippet = tail(&String::from_utf8_lossy(&stdout_bytes), 200);
                return Ok(ExecutionResult::failure(
                    format!("worker produced an unreadable result ({e}): {snippet}"),
                    String::new(),
                ));
            }
        };

        match (response.ok, response.err) {
            (Some(success), _) => Ok(ExecutionResult::success(success.table, success.stdout)),
            (None, Some(failure)) => Ok(ExecutionResult::failure(
                format!("{}: {}", failure.kind, failure.message),
                failure.stdout,
            )),
            (None, None) => Ok(ExecutionResult::failure(
                "worker produced an empty result".to_string(),
                String::new(),
            )),
        }
    }
}

fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let start = trimmed.len() - max;
    // Avoid slicing inside a UTF-8 sequence
    let boundary = (start..trimmed.len())
        .find(|&i| trimmed.is_char_boundary(i))
        .unwrap_or(start);
    format!("…{}", &trimmed[boundary..])
}
