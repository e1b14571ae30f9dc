//! Agent identifiers and alias normalization.
//!
//! Every component refers to agents through [`AgentId`]; user-supplied
//! strings are normalized here once so identifier comparisons never leak
//! into the adapters or the preset store.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The agents whose credentials are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentId {
    /// Claude Code (`~/.claude/settings.json`)
    Claude,
    /// Gemini CLI (`~/.gemini/.env`)
    Gemini,
    /// OpenAI Codex CLI (`~/.codex/config.toml` + `~/.codex/auth.json`)
    Codex,
}

impl AgentId {
    /// All supported agents, in display order.
    pub fn all() -> &'static [AgentId] {
        &[AgentId::Claude, AgentId::Gemini, AgentId::Codex]
    }

    /// Canonical identifier, also used as the preset document file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Claude => "claude",
            AgentId::Gemini => "gemini",
            AgentId::Codex => "codex",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            AgentId::Claude => "Claude Code",
            AgentId::Gemini => "Gemini CLI",
            AgentId::Codex => "OpenAI Codex CLI",
        }
    }

    /// Parse a user-provided identifier, accepting the usual aliases.
    pub fn from_id(id: &str) -> Option<AgentId> {
        match canonical_agent_id(id)? {
            "claude" => Some(AgentId::Claude),
            "gemini" => Some(AgentId::Gemini),
            "codex" => Some(AgentId::Codex),
            _ => None,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentId::from_id(s).ok_or_else(|| Error::AdapterUnavailable(s.to_string()))
    }
}

/// Normalize a user-provided agent identifier to its canonical ID.
pub fn canonical_agent_id(id: &str) -> Option<&'static str> {
    let id = id.trim();
    if id.eq_ignore_ascii_case("claude")
        || id.eq_ignore_ascii_case("claude-code")
        || id.eq_ignore_ascii_case("claude_code")
    {
        Some("claude")
    } else if id.eq_ignore_ascii_case("gemini")
        || id.eq_ignore_ascii_case("gemini-cli")
        || id.eq_ignore_ascii_case("gemini_cli")
    {
        Some("gemini")
    } else if id.eq_ignore_ascii_case("codex")
        || id.eq_ignore_ascii_case("codex-cli")
        || id.eq_ignore_ascii_case("codex_cli")
    {
        Some("codex")
    } else {
        None
    }
}
