//! Custom error types for Newsroom
//!
//! Provides a unified error handling system across all modules. Adapter
//! failures carry their own transient/permanent classification so the
//! orchestrator can fold them into history instead of propagating them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Newsroom operations
#[derive(Error, Debug)]
pub enum NewsroomError {
    /// A tool name was resolved that the registry does not know
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool name was registered twice
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// A capability adapter failed
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// The loop reached its iteration ceiling without an answer
    #[error("Could not complete the request within {iterations} planning steps")]
    PlannerExhausted { iterations: usize },

    /// The goal needs clarification from the user
    #[error("Ambiguous input: {0}")]
    AmbiguousInput(String),

    /// Session lifecycle errors (bad resume, missing token, ...)
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Newsroom operations
pub type Result<T> = std::result::Result<T, NewsroomError>;

impl NewsroomError {
    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Whether a failed call may succeed if issued again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Timeout, rate limit, unavailable service
    Transient,
    /// Malformed input, missing document, unusable output
    Permanent,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Failure reported by a capability adapter or an external service
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} failure: {message}")]
pub struct AdapterError {
    pub kind: FailureKind,
    pub message: String,
}

impl AdapterError {
    /// Create a retry-eligible failure
    pub fn transient(msg: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: msg.into(),
        }
    }

    /// Create a failure that retrying with the same input cannot fix
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: msg.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }

    /// Classify an HTTP client failure
    pub fn from_http(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::transient(err.to_string());
        }
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::transient(err.to_string()),
        }
    }

    /// Classify an HTTP status code
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 429 || status == 408 || status >= 500 {
            Self::transient(format!("service returned {}: {}", status, body))
        } else {
            Self::permanent(format!("service returned {}: {}", status, body))
        }
    }
}
