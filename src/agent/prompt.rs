//! Prompt assembly and completion parsing.
//!
//! The prompt carries everything the model may use: condensed stats, the
//! column list, a small row sample, a trailing window of the transcript,
//! the instruction, and — while retrying — the previous error. The
//! response contract is a single JSON object tagged by `action`.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::agent::state::{AgentState, MAX_RETRIES};
use crate::error::AgentError;
use crate::table::Table;

/// Rows included in the prompt sample.
const SAMPLE_ROWS: usize = 5;

/// Closed set of model actions. Text with no parseable JSON object maps to
/// `Answer` verbatim; a parseable object with an unknown tag is an
/// execution error, never an uncaught branch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ModelAction {
    Answer {
        #[serde(default)]
        content: String,
    },
    Clarify {
        #[serde(default)]
        content: String,
    },
    Visualize {
        #[serde(default = "default_title")]
        title: String,
        #[serde(rename = "type", default = "default_chart_type")]
        chart_type: String,
        #[serde(rename = "xAxisKey", default)]
        x_axis_key: String,
        #[serde(rename = "yAxisKey", default)]
        y_axis_key: String,
    },
    Code {
        #[serde(default)]
        content: String,
        #[serde(default)]
        explanation: String,
    },
}

fn default_title() -> String {
    "Chart".to_string()
}

fn default_chart_type() -> String {
    "bar".to_string()
}

pub fn build(state: &AgentState, table: Option<&Table>, history_window: usize) -> String {
    let stats = table.map(|t| t.summary()).unwrap_or_else(|| "No data.".to_string());
    let columns = table
        .map(|t| t.columns.join(", "))
        .unwrap_or_default();
    let sample = table
        .and_then(|t| serde_json::to_string_pretty(&t.sample(SAMPLE_ROWS)).ok())
        .unwrap_or_else(|| "[]".to_string());

    let mut history = String::new();
    if !state.transcript.is_empty() {
        history.push_str("\n**Conversation History:**\n");
        let skip = state.transcript.len().saturating_sub(history_window);
        for turn in &state.transcript[skip..] {
            let role = if turn.role == "user" { "User" } else { "Assistant" };
            history.push_str(&format!("{role}: {}\n", turn.text));
        }
    }

    let error = state
        .error
        .as_ref()
        .map(|e| format!("\nError: {e}\nPlease fix the error and try again."))
        .unwrap_or_default();
    let retry = if state.retry_count > 0 {
        format!("\nRetry {}/{MAX_RETRIES}", state.retry_count + 1)
    } else {
        String::new()
    };

    format!(
        r#"You are an expert data analyst AI assistant.
**Current Dataset Summary:**
{stats}

**Available Columns:** {columns}

**Sample Data (first {SAMPLE_ROWS} rows):**
{sample}
{history}
**User Request:** "{instruction}"
{error}{retry}

**Instructions:**
1. ALWAYS respond with valid JSON only.
2. Use ONLY the summary and sample data provided.
3. When writing a script, operate on the table bound as 'df'. Each column
   is also bound as a vector variable with elementwise arithmetic. You may
   use the math and statistics modules (including statistics.correlation
   and statistics.linear_regression for simple modeling), df.filter(mask),
   df.sort_by(name), df.head(n), df.drop(name), df.rename(old, new), and
   column aggregates (.sum(), .mean(), .min(), .max(), .count(),
   .unique(), .fillna(v), .map(fn)). No imports, no file or network
   access.

**Available Actions:**
- "answer": Direct answer
- "code": Write a script to analyze/transform the table
- "visualize": Create a data visualization (args: title, type, xAxisKey, yAxisKey)
- "clarify": Ask for clarification

**Response Format Examples:**
{{"action": "answer", "content": "The average is 42."}}
{{"action": "code", "content": "df['new_col'] = df['old_col'] * 2", "explanation": "Doubling values"}}
{{"action": "visualize", "title": "Sales", "type": "bar", "xAxisKey": "month", "yAxisKey": "sales"}}
{{"action": "clarify", "content": "Which column?"}}

**Now provide your response as JSON:**"#,
        instruction = state.instruction,
    )
}

/// Parses a completion into a model action.
///
/// - no JSON object found, or unparseable JSON → `Answer` with the raw
///   text verbatim
/// - valid JSON with an unknown/missing `action` tag → execution error
///   (takes the code-failure retry path)
pub fn parse_response(raw: &str) -> Result<ModelAction, AgentError> {
    let Some(json_text) = extract_json(raw) else {
        return Ok(ModelAction::Answer {
            content: raw.to_string(),
        });
    };

    let value: serde_json::Value = match serde_json::from_str(&json_text) {
        Ok(value) => value,
        Err(_) => {
            return Ok(ModelAction::Answer {
                content: raw.to_string(),
            })
        }
    };

    match serde_json::from_value::<ModelAction>(value.clone()) {
        Ok(action) => Ok(action),
        Err(_) => {
            let tag = value
                .get("action")
                .and_then(|v| v.as_str())
                .unwrap_or("<missing>");
            Err(AgentError::Execution(format!("Unknown action: {tag}")))
        }
    }
}

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("static regex"));
static BARE_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").expect("static regex"));

/// Pulls the first JSON object out of a completion: a ```json fenced block
/// if present, otherwise the first brace-delimited span.
fn extract_json(raw: &str) -> Option<String> {
    if let Some(captures) = FENCED_JSON.captures(raw) {
        return Some(captures[1].to_string());
    }
    BARE_JSON.captures(raw).map(|c| c[1].to_string())
}
