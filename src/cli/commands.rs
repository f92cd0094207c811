//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::Status;
use crate::cli::repl::Repl;
use crate::cli::render_history;
use crate::core::{Config, Result};

/// Result of parsing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Drop the current session
    Clear,
}

/// Parse and handle special commands.
///
/// While the current session awaits a clarification only `/`-prefixed input
/// is a command; anything else is the user's answer.
pub fn handle_command(input: &str, repl: &mut Repl) -> Result<CommandResult> {
    let input = input.trim();
    let awaiting = repl
        .session()
        .is_some_and(|s| s.status() == Status::AwaitingInput);
    if awaiting && !input.starts_with('/') {
        return Ok(CommandResult::Continue(input.to_string()));
    }

    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].trim_start_matches('/').to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            repl.clear_session();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "tools" => {
            let output = repl
                .orchestrator()
                .registry()
                .list()
                .iter()
                .map(|spec| {
                    format!(
                        "  {:<10} {:<10} {} (timeout {} ms)",
                        spec.name, spec.kind, spec.description, spec.timeout_ms
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandResult::Handled(format!("Registered tools:\n{}", output)))
        }

        "history" => match repl.session() {
            Some(state) => Ok(CommandResult::Handled(render_history(state))),
            None => Ok(CommandResult::Handled("No session yet.".to_string())),
        },

        "status" => {
            let config = repl.config();
            let session = match repl.session() {
                Some(state) => format!(
                    "{} ({}, {} calls, {} errors)\n\
                     Started:        {}\n\
                     Last activity:  {}",
                    state.id(),
                    state.status(),
                    state.history().len(),
                    state.error_count(),
                    state.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
                    state.updated_at().format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => "none".to_string(),
            };
            let status = format!(
                "Newsroom Status:\n\
                 ─────────────────────────────\n\
                 Backend:        {:?}\n\
                 Max iterations: {}\n\
                 Error ceiling:  {}\n\
                 Session:        {}",
                config.models.backend,
                repl.orchestrator().max_iterations(),
                repl.orchestrator().planner().policy().error_ceiling,
                session
            );
            Ok(CommandResult::Handled(status))
        }

        "config" => match args {
            "" => Ok(CommandResult::Handled(format!(
                "Config file: {}\n\n{}",
                Config::config_file().display(),
                repl.config().to_toml()?
            ))),
            "save" => {
                let path = repl.config().save()?;
                Ok(CommandResult::Handled(format!("Configuration saved to {}", path.display())))
            }
            _ => Ok(CommandResult::Handled("Usage: config [save]".to_string())),
        },

        "save" => match repl.session() {
            Some(state) => {
                let token = repl.sessions().save(state)?;
                Ok(CommandResult::Handled(format!("Session saved. Resume token: {}", token)))
            }
            None => Ok(CommandResult::Handled("No session to save.".to_string())),
        },

        "sessions" => {
            let tokens = repl.sessions().list()?;
            if tokens.is_empty() {
                Ok(CommandResult::Handled("No saved sessions.".to_string()))
            } else {
                Ok(CommandResult::Handled(format!("Saved sessions:\n  {}", tokens.join("\n  "))))
            }
        }

        "load" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: load <token>".to_string()));
            }
            let state = repl.sessions().load(args)?;
            let message = format!("Loaded session {} ({})", state.id(), state.status());
            repl.set_session(state);
            Ok(CommandResult::Handled(message))
        }

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Newsroom Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Newsroom
  clear, reset     Drop the current session
  status           Show configuration and session status
  config [save]    Show the effective configuration, or write it to the config file
  tools            List registered tools
  history          Show the tool calls of the current session
  save             Save the current session for later resume
  sessions         List saved sessions
  load <token>     Load a saved session

Anything else is a question for the agent. When the agent asks for
clarification, your next line is taken as the answer; prefix commands
with '/' (e.g. /status) while a clarification is pending.
─────────────────────────────────────────────"#
        .to_string()
}
