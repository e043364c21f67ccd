//! Snapshot history: named checkpoints for undo.
//!
//! A checkpoint duplicates the current working table under a fresh handle
//! before any mutating code runs, so undo is a pure handle swap — no table
//! is ever rewritten in place.

use anyhow::Result;
use tracing::debug;

use crate::agent::state::{AgentState, UndoEntry};
use crate::store::TableStore;

impl AgentState {
    /// Pushes a checkpoint of the current working table. A no-op before
    /// the first upload (nothing to snapshot yet).
    pub fn push_snapshot(&mut self, store: &dyn TableStore, description: &str) -> Result<()> {
        let Some(handle) = &self.work_handle else {
            return Ok(());
        };
        let table = store.read(handle)?;
        let snapshot = store.write(&table)?;
        debug!("Snapshot {snapshot}: {description}");
        self.undo_stack.push(UndoEntry {
            description: description.to_string(),
            snapshot,
        });
        Ok(())
    }

    /// Pops the most recent checkpoint, or `None` when there is nothing
    /// to undo (informational, never an error).
    pub fn pop_snapshot(&mut self) -> Option<UndoEntry> {
        self.undo_stack.pop()
    }
}
