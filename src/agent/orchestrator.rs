//! Agent orchestrator
//!
//! Drives the planner, the tool registry and the session state in a bounded
//! loop: decide, dispatch, record, repeat. Adapter failures are folded into
//! the session history and never escape this module; only registry errors
//! (an unknown tool) abort the loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::planner::{Action, Planner, PlannerPolicy};
use crate::agent::state::{AgentState, Status};
use crate::core::config::AgentConfig;
use crate::core::text;
use crate::core::{AdapterError, CallOutcome, Goal, Invocation, NewsroomError, Result, ToolKind};
use crate::tools::{RegisteredTool, ToolRegistry};

/// Result of one executed call, not yet recorded
struct Executed {
    invocation: Invocation,
    kind: ToolKind,
    outcome: CallOutcome,
    latency_ms: u64,
    started_at: DateTime<Utc>,
}

/// Runs agent sessions against a shared tool registry
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    planner: Planner,
    max_iterations: usize,
}

impl Orchestrator {
    /// Create an orchestrator with the configured policy
    pub fn new(registry: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        let planner = Planner::from_registry(&registry, PlannerPolicy::from(config));
        Self::with_planner(registry, planner)
    }

    /// Create an orchestrator around an explicit planner. The iteration
    /// ceiling is the one the planner budgets for.
    pub fn with_planner(registry: Arc<ToolRegistry>, planner: Planner) -> Self {
        let max_iterations = planner.policy().max_iterations.max(1);
        Self {
            registry,
            planner,
            max_iterations,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Start a new session and run it until it stops
    pub async fn start(&self, goal: Goal) -> Result<AgentState> {
        let mut state = AgentState::new(goal);
        tracing::info!(
            session = %state.id(),
            goal = %text::preview(state.goal().query(), 80),
            intent = %state.goal().intent(),
            "session started"
        );
        self.run(&mut state).await?;
        Ok(state)
    }

    /// Resume a session awaiting input with the user's clarification
    pub async fn resume(&self, state: &mut AgentState, input: &str) -> Result<Status> {
        state.resume(input)?;
        tracing::info!(session = %state.id(), clarification = %text::preview(input, 80), "session resumed");
        self.run(state).await
    }

    /// Run a session until it finishes, fails or needs input
    pub async fn run(&self, state: &mut AgentState) -> Result<Status> {
        self.run_until_cancelled(state, &CancellationToken::new()).await
    }

    /// Like `run`, but stops at the next iteration boundary (or abandons the
    /// in-flight call) once `cancel` fires. A cancelled session ends failed.
    pub async fn run_until_cancelled(
        &self,
        state: &mut AgentState,
        cancel: &CancellationToken,
    ) -> Result<Status> {
        if state.status() != Status::Running {
            return Err(NewsroomError::session(format!(
                "session {} is {}, not running",
                state.id(),
                state.status()
            )));
        }

        state.begin_run();
        while state.steps() < self.max_iterations {
            if cancel.is_cancelled() {
                return self.cancelled(state);
            }

            let action = self.planner.decide(state);
            state.count_step();
            let iteration = state.steps();
            tracing::debug!(session = %state.id(), iteration, action = ?action, "planner decision");

            match action {
                Action::Invoke(invocation) => {
                    let tool = self.registry.resolve(&invocation.tool)?;
                    let executed = tokio::select! {
                        _ = cancel.cancelled() => return self.cancelled(state),
                        executed = execute(tool, invocation) => executed,
                    };
                    self.apply(state, executed)?;
                }
                Action::InvokeAll { calls } => {
                    let tools = calls
                        .iter()
                        .map(|c| self.registry.resolve(&c.tool))
                        .collect::<Result<Vec<_>>>()?;
                    let batch = join_all(
                        tools
                            .into_iter()
                            .zip(calls)
                            .map(|(tool, invocation)| execute(tool, invocation)),
                    );
                    let executed = tokio::select! {
                        _ = cancel.cancelled() => return self.cancelled(state),
                        executed = batch => executed,
                    };
                    for call in executed {
                        self.apply(state, call)?;
                    }
                }
                Action::AskUser { prompt } => {
                    tracing::info!(session = %state.id(), iteration, "awaiting user input");
                    state.await_input(prompt)?;
                    return Ok(state.status());
                }
                Action::Finish { answer, degraded } => {
                    if degraded {
                        tracing::warn!(
                            session = %state.id(),
                            errors = state.error_count(),
                            "finishing with a degraded answer"
                        );
                    } else {
                        tracing::info!(session = %state.id(), calls = state.history().len(), "session succeeded");
                    }
                    state.finish(answer, degraded)?;
                    return Ok(state.status());
                }
            }
        }

        let exhausted = NewsroomError::PlannerExhausted {
            iterations: self.max_iterations,
        };
        tracing::warn!(session = %state.id(), calls = state.history().len(), "{}", exhausted);
        state.fail(exhausted.to_string())?;
        Ok(state.status())
    }

    fn apply(&self, state: &mut AgentState, executed: Executed) -> Result<()> {
        let session = state.id();
        let call = state.record(
            executed.kind,
            executed.invocation,
            executed.outcome,
            executed.latency_ms,
            executed.started_at,
        )?;

        match call.error() {
            None => tracing::info!(
                session = %session,
                tool = %call.tool,
                attempt = call.attempt,
                latency_ms = call.latency_ms,
                "tool call succeeded"
            ),
            Some(error) => tracing::warn!(
                session = %session,
                tool = %call.tool,
                attempt = call.attempt,
                latency_ms = call.latency_ms,
                kind = %error.kind,
                error = %error.message,
                "tool call failed"
            ),
        }
        Ok(())
    }

    fn cancelled(&self, state: &mut AgentState) -> Result<Status> {
        tracing::warn!(session = %state.id(), "session cancelled");
        state.fail("The session was cancelled.")?;
        Ok(state.status())
    }
}

/// Validate and perform one call under the tool's timeout
async fn execute(tool: &RegisteredTool, invocation: Invocation) -> Executed {
    let spec = tool.spec();
    let started_at = Utc::now();
    let start = Instant::now();

    let outcome = match tool.validate(&invocation.input) {
        Err(error) => CallOutcome::Failure { error },
        Ok(()) => {
            let input: Value = invocation.input.clone();
            match tokio::time::timeout(spec.timeout(), tool.capability().invoke(input)).await {
                Ok(Ok(output)) => CallOutcome::Success { output },
                Ok(Err(error)) => CallOutcome::Failure { error },
                Err(_) => CallOutcome::Failure {
                    error: AdapterError::transient(format!(
                        "'{}' timed out after {} ms",
                        spec.name, spec.timeout_ms
                    )),
                },
            }
        }
    };

    Executed {
        invocation,
        kind: spec.kind,
        outcome,
        latency_ms: start.elapsed().as_millis() as u64,
        started_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolSpec;
    use crate::tools::Capability;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct Hits;

    #[async_trait]
    impl Capability for Hits {
        async fn invoke(&self, input: Value) -> std::result::Result<Value, AdapterError> {
            Ok(json!({ "query": input["query"], "hits": [{ "id": "doc-1", "score": 0.8 }] }))
        }
    }

    struct Slow;

    #[async_trait]
    impl Capability for Slow {
        async fn invoke(&self, _input: Value) -> std::result::Result<Value, AdapterError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    fn orchestrator(summarizer: impl Capability + 'static, timeout_ms: u64) -> Orchestrator {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("retrieve", ToolKind::Retrieve, "search"), Hits)
            .unwrap();
        registry
            .register(
                ToolSpec::new("summarize", ToolKind::Summarize, "summary").timeout_ms(timeout_ms),
                summarizer,
            )
            .unwrap();
        Orchestrator::new(Arc::new(registry), &AgentConfig::default())
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let orchestrator = orchestrator(Slow, 20);
        let state = orchestrator.start(Goal::new("Summarize wildfires")).await.unwrap();

        let summaries: Vec<_> = state.history().iter().filter(|c| c.tool == "summarize").collect();
        assert_eq!(summaries.len(), 3);
        assert!(summaries.iter().all(|c| c.error().is_some_and(|e| e.is_transient())));
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let orchestrator = orchestrator(Slow, 20);
        let mut state = AgentState::new(Goal::new("Summarize wildfires"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = orchestrator.run_until_cancelled(&mut state, &cancel).await.unwrap();
        assert_eq!(status, Status::Failed);
        assert!(state.history().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_call() {
        let orchestrator = orchestrator(Slow, 60_000);
        let mut state = AgentState::new(Goal::new("Summarize wildfires"));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let status = orchestrator.run_until_cancelled(&mut state, &cancel).await.unwrap();
        assert_eq!(status, Status::Failed);
        assert_eq!(state.history().len(), 1);
        assert!(state.summary("doc-1").is_none());
    }

    #[tokio::test]
    async fn test_run_rejects_finished_session() {
        let orchestrator = orchestrator(Slow, 20);
        let mut state = AgentState::new(Goal::new("Summarize wildfires"));
        state.finish("done", false).unwrap();
        assert!(orchestrator.run(&mut state).await.is_err());
    }
}
