mod agent;
mod cache;
mod config;
mod diff;
mod error;
mod executor;
mod llm;
mod store;
mod table;

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::agent::AgentRuntime;
use crate::config::Config;
use crate::llm::AnthropicClient;
use crate::store::DiskStore;

fn print_help() {
    println!(
        "\
dataloom v{}

An agent execution core for conversational analysis of tabular datasets.

USAGE:
    dataloom [OPTIONS] [CONFIG_PATH] [CSV_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/agent.toml]
    CSV_PATH       Dataset to load at startup (otherwise use /load)

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

COMMANDS (inside the session):
    /load <path>     Load a CSV dataset
    undo, /undo      Revert the last code transformation
    /export [name]   Write the current table to CSV
    /quit            Exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG              Log level filter for tracing
                          (e.g. debug, dataloom=debug,warn)
    ANTHROPIC_API_KEY     API key for Anthropic Claude models
                          (from https://console.anthropic.com/)

EXAMPLES:
    dataloom                                # uses config/agent.toml
    dataloom config/agent.toml data.csv     # load a dataset at startup
    RUST_LOG=debug dataloom                 # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("dataloom v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dataloom=info")),
        )
        .init();

    println!(
        r#"
   ____        _        _
  |  _ \  __ _| |_ __ _| | ___   ___  _ __ ___
  | | | |/ _` | __/ _` | |/ _ \ / _ \| '_ ` _ \
  | |_| | (_| | || (_| | | (_) | (_) | | | | | |
  |____/ \__,_|\__\__,_|_|\___/ \___/|_| |_| |_|
                                      v{}
"#,
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config/agent.toml".to_string());
    let csv_path = args.next();

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    info!("Agent: {}", config.agent.name);
    info!("LLM: {} ({})", config.llm.provider, config.llm.model);
    info!(
        "Executor: {} ({}s budget)",
        config.executor.interpreter, config.executor.timeout_seconds
    );

    let store = Arc::new(DiskStore::open(&config.storage.path)?);
    store.cleanup_old(config.storage.session_ttl_hours);

    let llm = Arc::new(AnthropicClient::new(config.llm.clone()));
    let runtime = AgentRuntime::new(config.clone(), llm, store);

    let mut state = runtime.new_session();
    if let Some(path) = csv_path {
        let content = std::fs::read(&path)?;
        state = runtime.upload(state, &content).await;
        println!("{}\n", state.message);
    } else {
        println!("No dataset loaded. Use /load <path> to start.\n");
    }

    // ── Instruction loop ───────────────────────────────────────────
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        if let Some(path) = line.strip_prefix("/load ") {
            match std::fs::read(path.trim()) {
                Ok(content) => {
                    state = runtime.upload(state, &content).await;
                    println!("{}\n", state.message);
                }
                Err(e) => println!("Cannot read {}: {e}\n", path.trim()),
            }
            continue;
        }

        state = runtime.accept(state, line).await;
        println!("{}\n", state.message);
        if let Some(tool) = &state.last_tool {
            println!("[tool] {}: {}\n", tool.name, tool.args);
        }
    }

    info!("Session ended");
    Ok(())
}
