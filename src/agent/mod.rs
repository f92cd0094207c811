//! Agent module - planning and orchestration
//!
//! Contains the session state, the pure planner, the orchestration loop and
//! session persistence.

pub mod orchestrator;
pub mod planner;
pub mod session;
pub mod state;

pub use orchestrator::Orchestrator;
pub use planner::{Action, Planner, PlannerPolicy, ToolNames};
pub use session::SessionStore;
pub use state::{AgentState, Retrieval, Status};
