//! Newsroom - grounded question answering over a news corpus
//!
//! Main entry point for the CLI application.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use newsroom::agent::SessionStore;
use newsroom::cli::{bootstrap, exit_code, render_history, render_outcome};
use newsroom::{Config, Constraints, Goal, Repl, Status};
use tracing_subscriber::EnvFilter;

/// Newsroom - grounded question answering over a news corpus
#[derive(Parser, Debug)]
#[command(name = "newsroom")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question or task, e.g. "Summarize the most relevant article about wildfires"
    goal: Option<String>,

    /// Resume a session that is awaiting input
    #[arg(long, requires = "reply", conflicts_with = "goal")]
    resume: Option<String>,

    /// Answer to the pending question of the resumed session
    #[arg(long, requires = "resume")]
    reply: Option<String>,

    /// JSON-lines corpus to load
    #[arg(long, short = 'c')]
    corpus: Option<PathBuf>,

    /// Number of documents the answer should cover
    #[arg(long, short = 'n')]
    max_results: Option<NonZeroUsize>,

    /// Planner decisions allowed per run
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Use Ollama instead of the offline backend
    #[arg(long)]
    ollama: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Start the interactive REPL
    #[arg(long, short = 'i')]
    interactive: bool,
}

fn init_tracing(debug: bool) {
    let default = if debug { "newsroom=debug" } else { "newsroom=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(corpus) = args.corpus.clone() {
        config.store.corpus = Some(corpus);
    }

    if let Some(max_iterations) = args.max_iterations {
        config.agent.max_iterations = max_iterations;
    }

    if args.ollama {
        config.models.backend = newsroom::core::config::Backend::Ollama;
    }

    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(config.agent.debug);

    if args.interactive || (args.goal.is_none() && args.resume.is_none()) {
        let mut repl = Repl::with_config(config).await?;
        repl.run().await?;
        return Ok(ExitCode::SUCCESS);
    }

    let orchestrator = bootstrap(&config).await?;
    let sessions = SessionStore::new(config.store.sessions_dir.clone());

    let state = match (args.resume, args.reply, args.goal) {
        (Some(token), Some(reply), _) => {
            let mut state = sessions.load(&token)?;
            orchestrator.resume(&mut state, &reply).await?;
            state
        }
        (_, _, Some(query)) => {
            let constraints = Constraints {
                max_results: args.max_results.map(NonZeroUsize::get),
                ..Default::default()
            };
            orchestrator.start(Goal::with_constraints(query, constraints)).await?
        }
        _ => anyhow::bail!("a goal or --resume with --reply is required"),
    };

    println!("{}", render_outcome(&state));
    println!("\nTool calls:\n{}", render_history(&state));

    if state.status() == Status::AwaitingInput {
        let token = sessions.save(&state)?;
        println!("\nResume with: newsroom --resume {} --reply \"<answer>\"", token);
    } else {
        sessions.remove(&state.id().to_string())?;
    }

    Ok(ExitCode::from(exit_code(state.status()) as u8))
}
