//! In-memory tabular value.
//!
//! A `Table` is the unit of work the whole core moves around: uploaded from
//! CSV, snapshotted into the store, copied into the executor worker, diffed
//! and exported back to CSV. Cells are JSON values; `Null` is the missing
//! marker (two missing cells compare equal in the diff engine).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    /// Row-major cells; every row has exactly `columns.len()` entries.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Parses CSV bytes into a table, inferring cell types per value:
    /// integer, then float, then string; empty fields become null.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(data);

        let columns: Vec<String> = reader
            .headers()
            .context("CSV has no header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("malformed CSV record")?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Renders the table back to CSV (header + rows, nulls as empty fields).
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| cell_to_string(c)))?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First `n` rows as column→value records, for the prompt sample.
    pub fn sample(&self, n: usize) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Condensed stats block for the prompt: shape plus per-column
    /// inferred type and missing count.
    pub fn summary(&self) -> String {
        let mut out = format!("Shape: ({}, {})\nColumns:\n", self.n_rows(), self.n_cols());
        for (idx, name) in self.columns.iter().enumerate() {
            let missing = self
                .rows
                .iter()
                .filter(|row| row.get(idx).map(|c| c.is_null()).unwrap_or(true))
                .count();
            out.push_str(&format!(
                "  {name}: {} ({missing} missing)\n",
                self.column_type(idx)
            ));
        }
        out
    }

    /// Inferred type of one column, from its non-null cells.
    fn column_type(&self, idx: usize) -> &'static str {
        let mut saw_int = false;
        let mut saw_float = false;
        let mut saw_bool = false;
        let mut saw_str = false;
        let mut saw_value = false;

        for row in &self.rows {
            match row.get(idx) {
                Some(Value::Null) | None => {}
                Some(Value::Number(n)) => {
                    saw_value = true;
                    if n.is_i64() || n.is_u64() {
                        saw_int = true;
                    } else {
                        saw_float = true;
                    }
                }
                Some(Value::Bool(_)) => {
                    saw_value = true;
                    saw_bool = true;
                }
                Some(_) => {
                    saw_value = true;
                    saw_str = true;
                }
            }
        }

        match (saw_value, saw_str, saw_bool, saw_float, saw_int) {
            (false, ..) => "empty",
            (_, true, ..) => "str",
            (_, _, true, false, false) => "bool",
            (_, _, _, true, _) => "float",
            _ => "int",
        }
    }
}

fn parse_cell(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(field.to_string())
}

/// Display form of a cell, shared by CSV export and diff examples.
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
