//! `LlmClient` trait — abstraction over LLM backends.
//!
//! The orchestrator only needs one capability: a prompt string in, a
//! completion string out, or a failure. Providers translate that into
//! their own wire format behind this trait.

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over LLM backends.
///
/// A failure here is a transport/configuration problem (`Model` in the
/// agent taxonomy), never a content problem — unparseable completions are
/// still `Ok` and handled downstream.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt to the LLM and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Human-readable description of the provider and model.
    ///
    /// Used in status output, e.g. `"anthropic (claude-sonnet-4-5-20250929)"`.
    fn description(&self) -> String;
}
