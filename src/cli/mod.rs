//! CLI module - command-line interface
//!
//! Contains the REPL, its commands, and the wiring shared with one-shot mode.

pub mod commands;
pub mod repl;

use std::sync::Arc;

use crate::agent::{AgentState, Orchestrator, Status};
use crate::core::config::Backend;
use crate::core::text;
use crate::core::{CallOutcome, Config, Result};
use crate::services::{corpus, OllamaClient, Services};
use crate::tools::build_registry;

pub use repl::Repl;

/// Process exit code for a session that succeeded
pub const EXIT_SUCCEEDED: i32 = 0;
/// Process exit code for a failed session
pub const EXIT_FAILED: i32 = 1;
/// Process exit code for a session waiting for the user
pub const EXIT_AWAITING_INPUT: i32 = 3;

/// Exit code reported for a session status
pub fn exit_code(status: Status) -> i32 {
    match status {
        Status::Succeeded => EXIT_SUCCEEDED,
        Status::AwaitingInput => EXIT_AWAITING_INPUT,
        Status::Running | Status::Failed => EXIT_FAILED,
    }
}

/// Build services, load the corpus and assemble the orchestrator
pub async fn bootstrap(config: &Config) -> Result<Orchestrator> {
    if config.models.backend == Backend::Ollama {
        let client = OllamaClient::from_config(config)?;
        if let Err(e) = client.check_models().await {
            tracing::warn!(url = %client.base_url(), "{}", e);
        }
    }

    let services = Services::from_config(config)?;

    match config.store.corpus {
        Some(ref path) => {
            let docs = corpus::read_corpus(path)?;
            corpus::ingest(&services, docs).await?;
        }
        None => tracing::warn!("no corpus configured; retrieval will find nothing"),
    }

    let registry = build_registry(&services, config.agent.tool_timeout_ms)?;
    Ok(Orchestrator::new(Arc::new(registry), &config.agent))
}

/// Human-readable result of a session: answer, prompt or failure reason
pub fn render_outcome(state: &AgentState) -> String {
    match state.status() {
        Status::Succeeded if state.is_degraded() => {
            format!("{}\n(degraded answer)", state.answer().unwrap_or_default())
        }
        Status::Succeeded => state.answer().unwrap_or_default().to_string(),
        Status::AwaitingInput => format!("? {}", state.prompt().unwrap_or_default()),
        Status::Failed => format!("Failed: {}", state.answer().unwrap_or("unknown error")),
        Status::Running => "Session is still running.".to_string(),
    }
}

/// One line per recorded tool call
pub fn render_history(state: &AgentState) -> String {
    if state.history().is_empty() {
        return "No tool calls.".to_string();
    }

    state
        .history()
        .iter()
        .map(|call| {
            let result = match call.outcome {
                CallOutcome::Success { ref output } => {
                    format!("ok    {}", text::preview(&output.to_string(), 60))
                }
                CallOutcome::Failure { ref error } => format!("error {}", error),
            };
            format!(
                "  #{} {} {} (attempt {}, {} ms) {}",
                call.sequence + 1,
                call.tool,
                call.input,
                call.attempt,
                call.latency_ms,
                result
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
