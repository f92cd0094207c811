//! Session persistence
//!
//! Sessions awaiting input are written to disk as JSON so a later process can
//! resume them by token. The token is the session id.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::agent::state::AgentState;
use crate::core::{NewsroomError, Result};

/// Directory of saved session snapshots
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot and return its resume token
    pub fn save(&self, state: &AgentState) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let token = state.id().to_string();
        let content = serde_json::to_string_pretty(state)?;
        fs::write(self.path_for(&token)?, content)?;
        tracing::debug!(session = %token, dir = %self.dir.display(), "session saved");
        Ok(token)
    }

    /// Read the snapshot for a resume token
    pub fn load(&self, token: &str) -> Result<AgentState> {
        let path = self.path_for(token)?;
        if !path.exists() {
            return Err(NewsroomError::session(format!("no saved session for token {}", token)));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Delete a snapshot. Removing an unknown token is not an error.
    pub fn remove(&self, token: &str) -> Result<()> {
        let path = self.path_for(token)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Tokens of all saved sessions, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut tokens: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                Uuid::parse_str(stem).ok().map(|_| stem.to_string())
            })
            .collect();
        tokens.sort();
        Ok(tokens)
    }

    fn path_for(&self, token: &str) -> Result<PathBuf> {
        let id = Uuid::parse_str(token.trim())
            .map_err(|_| NewsroomError::session(format!("invalid resume token '{}'", token)))?;
        Ok(self.dir.join(format!("{}.json", id)))
    }
}
