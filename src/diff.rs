//! Diff engine: explains what a code execution did to the table.
//!
//! Produces an ordered list of human-readable statements. Structural
//! changes (shape, column identity) are always reported; cell-level
//! comparison only runs when shape and columns are identical and the table
//! is small enough. The comparison is infallible — the worst it can say is
//! that nothing changed.

use serde_json::Value;

use crate::table::{cell_to_string, Table};

/// Tables above this row count skip the cell-by-cell pass.
const CELL_DIFF_MAX_ROWS: usize = 10_000;

/// Maximum number of example cell changes listed.
const MAX_EXAMPLES: usize = 5;

pub fn compare(before: Option<&Table>, after: &Table) -> Vec<String> {
    let Some(before) = before else {
        return vec!["New table created.".to_string()];
    };

    let mut changes = Vec::new();

    if before.shape() != after.shape() {
        changes.push(format!(
            "Shape change: ({}, {}) -> ({}, {})",
            before.n_rows(),
            before.n_cols(),
            after.n_rows(),
            after.n_cols()
        ));
        let row_delta = after.n_rows() as i64 - before.n_rows() as i64;
        if row_delta != 0 {
            changes.push(format!("Rows: {row_delta:+}"));
        }
        let col_delta = after.n_cols() as i64 - before.n_cols() as i64;
        if col_delta != 0 {
            changes.push(format!("Columns: {col_delta:+}"));
        }
    }

    if before.shape() == after.shape() && before.columns == after.columns {
        if before.n_rows() > CELL_DIFF_MAX_ROWS {
            changes.push("(Data too large for detailed cell-by-cell comparison)".to_string());
        } else {
            diff_cells(before, after, &mut changes);
        }
    } else if before.columns != after.columns {
        let added: Vec<&str> = after
            .columns
            .iter()
            .filter(|c| !before.columns.contains(c))
            .map(String::as_str)
            .collect();
        let removed: Vec<&str> = before
            .columns
            .iter()
            .filter(|c| !after.columns.contains(c))
            .map(String::as_str)
            .collect();
        if !added.is_empty() {
            changes.push(format!("New columns: {}", added.join(", ")));
        }
        if !removed.is_empty() {
            changes.push(format!("Removed columns: {}", removed.join(", ")));
        }
    }

    changes
}

fn diff_cells(before: &Table, after: &Table, changes: &mut Vec<String>) {
    let mut changed = 0usize;
    let mut examples = Vec::new();

    for (row_idx, (old_row, new_row)) in before.rows.iter().zip(&after.rows).enumerate() {
        for (col_idx, (old, new)) in old_row.iter().zip(new_row).enumerate() {
            if cells_equal(old, new) {
                continue;
            }
            changed += 1;
            if examples.len() < MAX_EXAMPLES {
                examples.push(format!(
                    "- Row {row_idx}, `{}`: `{}` -> `{}`",
                    before.columns[col_idx],
                    fmt_cell(old),
                    fmt_cell(new)
                ));
            }
        }
    }

    if changed > 0 {
        changes.push(format!("Values changed: {changed} cells modified."));
        changes.push(format!("Sample changes:\n{}", examples.join("\n")));
    } else if changes.is_empty() {
        changes.push("No changes detected.".to_string());
    }
}

/// Two missing values count as equal; everything else is plain equality.
fn cells_equal(a: &Value, b: &Value) -> bool {
    (a.is_null() && b.is_null()) || a == b
}

fn fmt_cell(cell: &Value) -> String {
    if cell.is_null() {
        "null".to_string()
    } else {
        cell_to_string(cell)
    }
}
