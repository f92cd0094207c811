//! Interactive REPL for Newsroom
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};

use crate::agent::{AgentState, Orchestrator, SessionStore, Status};
use crate::cli::commands::{handle_command, CommandResult};
use crate::cli::{bootstrap, render_history, render_outcome};
use crate::core::config::Backend;
use crate::core::{Config, Goal, NewsroomError, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    orchestrator: Orchestrator,
    sessions: SessionStore,
    session: Option<AgentState>,
}

impl Repl {
    /// Create a REPL with custom configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        let orchestrator = bootstrap(&config).await?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Create a REPL around an already assembled orchestrator
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        let sessions = SessionStore::new(config.store.sessions_dir.clone());
        Self {
            config,
            orchestrator,
            sessions,
            session: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The most recent session, if any
    pub fn session(&self) -> Option<&AgentState> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, state: AgentState) {
        self.session = Some(state);
    }

    pub fn clear_session(&mut self) {
        self.session = None;
    }

    /// Answer the pending question of the current session, or start a new one
    pub async fn submit(&mut self, input: &str) -> Result<&AgentState> {
        let awaiting = self
            .session
            .as_ref()
            .is_some_and(|s| s.status() == Status::AwaitingInput);

        match self.session.take() {
            Some(mut state) if awaiting => {
                let outcome = self.orchestrator.resume(&mut state, input).await;
                self.session = Some(state);
                outcome?;
            }
            _ => self.session = Some(self.orchestrator.start(Goal::new(input)).await?),
        }

        self.session
            .as_ref()
            .ok_or_else(|| NewsroomError::session("no active session"))
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let debug = self.config.agent.debug;

        loop {
            let awaiting = self
                .session
                .as_ref()
                .is_some_and(|s| s.status() == Status::AwaitingInput);
            print!("{}", if awaiting { "Reply: " } else { "You: " });
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, self) {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Session cleared.\n");
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(input)) => match self.submit(&input).await {
                    Ok(state) => {
                        if debug {
                            println!("{}\n", render_history(state));
                        }
                        println!("\n{}\n", render_outcome(state));
                    }
                    Err(e) => eprintln!("\nError: {}\n", e),
                },
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("Newsroom - grounded answers over your news corpus");
        match self.config.models.backend {
            Backend::Ollama => {
                println!("Backend:  ollama at {}", self.config.ollama_url());
                println!("Model:    {}", self.config.models.generative);
            }
            Backend::Local => println!("Backend:  local"),
        }
        if let Some(ref corpus) = self.config.store.corpus {
            println!("Corpus:   {}", corpus.display());
        }
        println!();
        println!("Commands: help, status, config, tools, history, clear, exit");
        println!("─────────────────────────────────────────────────────");
    }
}
