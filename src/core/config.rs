//! Configuration management for Newsroom
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/newsroom/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{NewsroomError, Result};

/// Main configuration for Newsroom
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Model configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Document store and session configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Which services back the capability adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Offline: hashing embedder, extractive summaries, heuristic extraction
    Local,
    /// Ollama for embeddings and generation
    Ollama,
}

impl std::str::FromStr for Backend {
    type Err = NewsroomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "ollama" => Ok(Backend::Ollama),
            other => Err(NewsroomError::config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Service backend
    pub backend: Backend,
    /// Model used for summarization and extraction
    pub generative: String,
    /// Model used for query and document embeddings
    pub embedding: String,
    /// Dimensions of the local hashing embedder
    pub hashing_dims: usize,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Planner decisions allowed per run before the session fails
    /// Default: 10
    pub max_iterations: usize,
    /// Failed tool calls tolerated before the planner gives up
    /// Default: 3
    pub error_ceiling: u32,
    /// Documents requested from the retriever
    pub top_k: usize,
    /// Per-call timeout applied to every tool
    pub tool_timeout_ms: u64,
    /// Summarize and extract the same document concurrently
    pub parallel_enrichment: bool,
    /// Write generated summaries and entities back to the store before finishing
    pub persist_annotations: bool,
    /// Whether to show debug output
    pub debug: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON-lines corpus loaded into the in-memory store at startup
    pub corpus: Option<PathBuf>,
    /// Directory holding suspended sessions
    pub sessions_dir: PathBuf,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: env::var("NEWSROOM_BACKEND")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(Backend::Local),
            generative: env::var("NEWSROOM_GENERATIVE_MODEL")
                .unwrap_or_else(|_| "qwen3:8b".to_string()),
            embedding: env::var("NEWSROOM_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            hashing_dims: 256,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: env::var("NEWSROOM_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            error_ceiling: 3,
            top_k: 3,
            tool_timeout_ms: 30_000,
            parallel_enrichment: false,
            persist_annotations: false,
            debug: env::var("NEWSROOM_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            corpus: env::var("NEWSROOM_CORPUS").ok().map(PathBuf::from),
            sessions_dir: env::var("NEWSROOM_SESSIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Config::data_dir().join("sessions")),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newsroom")
    }

    /// Get the data directory path
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newsroom")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::debug!(path = %Self::config_file().display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %Self::config_file().display(), error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Load configuration from file only; `None` when there is no file
    pub fn load_from_file() -> Result<Option<Self>> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| NewsroomError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content).map(Some)
    }

    /// Parse configuration from TOML text; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| NewsroomError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the config file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| NewsroomError::config(format!("Failed to create config dir: {}", e)))?;
        }

        fs::write(path, self.to_toml()?)
            .map_err(|e| NewsroomError::config(format!("Failed to write config: {}", e)))
    }

    /// Render as TOML, in the format `from_toml` reads
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NewsroomError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }
}
