//! Newsroom - grounded question answering over a news corpus
//!
//! An agent that answers questions about processed news articles by planning
//! calls to retrieval, summarization, extraction and storage tools.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Services**: Document store, search index, embedder and model backends
//! - **Tools**: Capability adapters and the tool registry
//! - **Agent**: Session state, planner and orchestration loop
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use newsroom::agent::Orchestrator;
//! use newsroom::services::{corpus, Services};
//! use newsroom::tools::build_registry;
//! use newsroom::{Config, Goal};
//!
//! #[tokio::main]
//! async fn main() -> newsroom::Result<()> {
//!     let config = Config::load();
//!     let services = Services::from_config(&config)?;
//!     corpus::ingest(&services, corpus::read_corpus("articles.jsonl".as_ref())?).await?;
//!
//!     let registry = build_registry(&services, config.agent.tool_timeout_ms)?;
//!     let orchestrator = Orchestrator::new(Arc::new(registry), &config.agent);
//!
//!     let state = orchestrator.start(Goal::new("Summarize the latest wildfire news")).await?;
//!     println!("{:?}: {:?}", state.status(), state.answer());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod services;
pub mod tools;

// Re-export commonly used items
pub use agent::{AgentState, Orchestrator, Status};
pub use cli::Repl;
pub use core::{Config, Constraints, Goal, NewsroomError, Result};
