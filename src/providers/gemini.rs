//! Gemini CLI adapter (`~/.gemini/.env`).

use std::path::{Path, PathBuf};

use crate::agent_ids::AgentId;
use crate::error::Result;
use crate::fields::{Fields, Update};
use crate::fs::{self, PRIVATE_FILE_MODE};
use crate::providers::{Backup, Provider};

pub const BASE_URL_KEY: &str = "GOOGLE_GEMINI_BASE_URL";
pub const TOKEN_KEY: &str = "GEMINI_API_KEY";
pub const MODEL_KEY: &str = "GEMINI_MODEL";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    env_path: PathBuf,
}

impl GeminiProvider {
    pub fn new(home: &Path) -> Self {
        Self {
            env_path: home.join(".gemini").join(".env"),
        }
    }

    fn load(&self) -> Result<Option<EnvFile>> {
        Ok(fs::read_optional(&self.env_path)?.map(|content| EnvFile::parse(&content)))
    }
}

impl Provider for GeminiProvider {
    fn id(&self) -> AgentId {
        AgentId::Gemini
    }

    fn paths(&self) -> Vec<PathBuf> {
        vec![self.env_path.clone()]
    }

    fn read(&self) -> Result<Fields> {
        let Some(env) = self.load()? else {
            tracing::debug!(path = %self.env_path.display(), "Gemini .env not found");
            return Ok(Fields::default());
        };
        let value = |v: &Option<String>| v.as_deref().map(unquote).unwrap_or_default().to_string();
        Ok(Fields {
            url: value(&env.url),
            token: value(&env.token),
            model: value(&env.model),
        })
    }

    fn write(&self, fields: &Fields, model: &Update<String>) -> Result<Backup> {
        self.validate(fields)?;

        let mut env = self.load()?.unwrap_or_default();
        if !fields.url.is_empty() {
            env.url = Some(fields.url.clone());
        }
        if !fields.token.is_empty() {
            env.token = Some(fields.token.clone());
        }
        match model {
            Update::Unchanged => {}
            Update::Clear => env.model = None,
            Update::Set(m) => env.model = Some(m.clone()),
        }

        let mut backup = Backup::new();
        backup.snapshot(&self.env_path)?;
        fs::write_atomic(&self.env_path, env.render().as_bytes(), PRIVATE_FILE_MODE)?;

        tracing::info!(path = %self.env_path.display(), "Wrote Gemini .env");
        Ok(backup)
    }
}

/// Key/value pairs of a `.env` file, with the managed keys split out.
#[derive(Debug, Default, PartialEq, Eq)]
struct EnvFile {
    /// Unmanaged pairs in first-appearance order, raw values.
    extra: Vec<(String, String)>,
    url: Option<String>,
    token: Option<String>,
    model: Option<String>,
}

impl EnvFile {
    /// Blank lines, `#` comments and lines without `=` are skipped; a
    /// repeated key keeps its first position and its last value.
    fn parse(content: &str) -> Self {
        let mut env = EnvFile::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().to_string();
            match key {
                BASE_URL_KEY => env.url = Some(value),
                TOKEN_KEY => env.token = Some(value),
                MODEL_KEY => env.model = Some(value),
                _ => match env.extra.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1 = value,
                    None => env.extra.push((key.to_string(), value)),
                },
            }
        }
        env
    }

    /// Unmanaged keys first, then the managed keys in a fixed order.
    fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.extra {
            out.push_str(&format!("{key}={value}\n"));
        }
        for (key, value) in [
            (BASE_URL_KEY, &self.url),
            (TOKEN_KEY, &self.token),
            (MODEL_KEY, &self.model),
        ] {
            if let Some(value) = value {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
