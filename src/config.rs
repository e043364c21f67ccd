use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Supports ${ENV_VAR} substitution
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_request: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Worker interpreter binary. The runner program only uses the
    /// standard library, so any python3 works.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Hard wall-clock budget for one code execution.
    #[serde(default = "default_exec_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Stored tables older than this are eligible for cleanup.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Default filename for /export when none is given.
    #[serde(default = "default_export_filename")]
    pub export_filename: String,
    /// How many trailing transcript turns go into the prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_exec_timeout() -> u64 {
    5
}

fn default_max_code_length() -> usize {
    10_000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data_store")
}

fn default_session_ttl() -> i64 {
    24
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_agent_name() -> String {
    "Dataloom".to_string()
}

fn default_export_filename() -> String {
    "cleaned.csv".to_string()
}

fn default_history_window() -> usize {
    6
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_seconds: default_exec_timeout(),
            max_code_length: default_max_code_length(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            session_ttl_hours: default_session_ttl(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            export_filename: default_export_filename(),
            history_window: default_history_window(),
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${ANTHROPIC_API_KEY}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}
