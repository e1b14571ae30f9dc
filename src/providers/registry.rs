use std::path::{Path, PathBuf};

use crate::agent_ids::AgentId;
use crate::error::{Error, Result};
use crate::providers::{ClaudeProvider, CodexProvider, GeminiProvider, Provider};

/// Maps agent identifiers to adapters rooted at one home directory.
#[derive(Debug, Clone)]
pub struct Registry {
    home: PathBuf,
}

impl Registry {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The adapter for a known agent.
    pub fn provider(&self, agent: AgentId) -> Box<dyn Provider> {
        match agent {
            AgentId::Claude => Box::new(ClaudeProvider::new(&self.home)),
            AgentId::Gemini => Box::new(GeminiProvider::new(&self.home)),
            AgentId::Codex => Box::new(CodexProvider::new(&self.home)),
        }
    }

    /// Look up by user-supplied identifier. Unknown identifiers yield `None`,
    /// never a default adapter.
    pub fn get(&self, id: &str) -> Option<Box<dyn Provider>> {
        AgentId::from_id(id).map(|agent| self.provider(agent))
    }

    /// Like [`Registry::get`] but unknown identifiers are an error.
    pub fn require(&self, id: &str) -> Result<Box<dyn Provider>> {
        self.get(id)
            .ok_or_else(|| Error::AdapterUnavailable(id.to_string()))
    }

    /// One adapter per supported agent.
    pub fn all(&self) -> Vec<Box<dyn Provider>> {
        AgentId::all().iter().map(|a| self.provider(*a)).collect()
    }
}
