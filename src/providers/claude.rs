//! Claude Code adapter (`~/.claude/settings.json`).
//!
//! The settings document is a JSON object whose `env` member is a flat
//! string map. Only the managed keys inside `env` change; every other key,
//! inside or outside `env`, is written back in its original order.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::agent_ids::AgentId;
use crate::error::{Error, Result};
use crate::fields::{Fields, Update};
use crate::fs::{self, PRIVATE_FILE_MODE};
use crate::providers::{Backup, Provider};

const ENV_KEY: &str = "env";

pub const BASE_URL_KEY: &str = "ANTHROPIC_BASE_URL";
pub const MODEL_KEY: &str = "ANTHROPIC_MODEL";

/// Token keys in read priority order. Writes only ever use the first.
pub const TOKEN_KEYS: [&str; 3] = [
    "ANTHROPIC_AUTH_TOKEN",
    "ANTHROPIC_API_TOKEN",
    "ANTHROPIC_API_KEY",
];

#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    settings_path: PathBuf,
}

impl ClaudeProvider {
    pub fn new(home: &Path) -> Self {
        Self {
            settings_path: home.join(".claude").join("settings.json"),
        }
    }

    fn load_settings(&self) -> Result<Option<Map<String, Value>>> {
        let Some(content) = fs::read_optional(&self.settings_path)? else {
            return Ok(None);
        };
        parse_settings(&content)
            .map(Some)
            .map_err(|reason| Error::malformed(&self.settings_path, reason))
    }
}

impl Provider for ClaudeProvider {
    fn id(&self) -> AgentId {
        AgentId::Claude
    }

    fn paths(&self) -> Vec<PathBuf> {
        vec![self.settings_path.clone()]
    }

    fn read(&self) -> Result<Fields> {
        let Some(settings) = self.load_settings()? else {
            tracing::debug!(path = %self.settings_path.display(), "Claude settings not found");
            return Ok(Fields::default());
        };
        let env = settings.get(ENV_KEY).and_then(Value::as_object);

        let token = TOKEN_KEYS
            .iter()
            .map(|key| env_str(env, key))
            .find(|v| !v.is_empty())
            .unwrap_or_default();

        Ok(Fields {
            url: env_str(env, BASE_URL_KEY).to_string(),
            token: token.to_string(),
            model: env_str(env, MODEL_KEY).to_string(),
        })
    }

    fn write(&self, fields: &Fields, model: &Update<String>) -> Result<Backup> {
        self.validate(fields)?;

        let mut settings = self.load_settings()?.unwrap_or_default();
        update_env(&mut settings, fields, model);

        let mut body = serde_json::to_string_pretty(&Value::Object(settings))
            .map_err(|e| Error::malformed(&self.settings_path, e))?;
        body.push('\n');

        let mut backup = Backup::new();
        backup.snapshot(&self.settings_path)?;
        fs::write_atomic(&self.settings_path, body.as_bytes(), PRIVATE_FILE_MODE)?;

        tracing::info!(path = %self.settings_path.display(), "Wrote Claude settings");
        Ok(backup)
    }
}

/// Parse the settings document, treating a blank file as an empty object.
fn parse_settings(content: &str) -> std::result::Result<Map<String, Value>, String> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(content).map_err(|e| e.to_string())? {
        Value::Object(map) => match map.get(ENV_KEY) {
            None | Some(Value::Null) | Some(Value::Object(_)) => Ok(map),
            Some(_) => Err(format!("`{ENV_KEY}` must be an object")),
        },
        _ => Err("settings must be a JSON object".to_string()),
    }
}

fn env_str<'a>(env: Option<&'a Map<String, Value>>, key: &str) -> &'a str {
    env.and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn update_env(settings: &mut Map<String, Value>, fields: &Fields, model: &Update<String>) {
    // Re-inserting an existing key keeps its position.
    if !settings.get(ENV_KEY).is_some_and(Value::is_object) {
        settings.insert(ENV_KEY.to_string(), Value::Object(Map::new()));
    }
    let Some(env) = settings.get_mut(ENV_KEY).and_then(Value::as_object_mut) else {
        return;
    };

    env.insert(BASE_URL_KEY.to_string(), Value::String(fields.url.clone()));
    // An empty token keeps whatever is already configured.
    if !fields.token.is_empty() {
        env.insert(TOKEN_KEYS[0].to_string(), Value::String(fields.token.clone()));
    }
    match model {
        Update::Unchanged => {}
        Update::Clear => {
            env.shift_remove(MODEL_KEY);
        }
        Update::Set(m) => {
            env.insert(MODEL_KEY.to_string(), Value::String(m.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider_with(content: Option<&str>) -> (TempDir, ClaudeProvider) {
        let temp_dir = TempDir::new().unwrap();
        let provider = ClaudeProvider::new(temp_dir.path());
        if let Some(content) = content {
            std::fs::create_dir_all(provider.settings_path.parent().unwrap()).unwrap();
            std::fs::write(&provider.settings_path, content).unwrap();
        }
        (temp_dir, provider)
    }

    fn read_json(provider: &ClaudeProvider) -> Value {
        let content = std::fs::read_to_string(&provider.settings_path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (_dir, provider) = provider_with(None);
        assert_eq!(provider.read().unwrap(), Fields::default());
    }

    #[test]
    fn test_read_token_priority_chain() {
        let (_dir, provider) = provider_with(Some(
            r#"{"env": {"ANTHROPIC_API_KEY": "key", "ANTHROPIC_API_TOKEN": "tok"}}"#,
        ));
        assert_eq!(provider.read().unwrap().token, "tok");

        let (_dir, provider) = provider_with(Some(
            r#"{"env": {"ANTHROPIC_AUTH_TOKEN": "", "ANTHROPIC_API_KEY": "key"}}"#,
        ));
        assert_eq!(provider.read().unwrap().token, "key");
    }

    #[test]
    fn test_read_malformed_json_is_error() {
        let (_dir, provider) = provider_with(Some("{\"env\": "));
        assert!(matches!(
            provider.read(),
            Err(Error::MalformedConfig { .. })
        ));
    }

    #[test]
    fn test_read_non_object_env_is_error() {
        let (_dir, provider) = provider_with(Some(r#"{"env": ["x"]}"#));
        assert!(matches!(
            provider.read(),
            Err(Error::MalformedConfig { .. })
        ));
    }

    #[test]
    fn test_write_preserves_unrelated_keys() {
        let (_dir, provider) = provider_with(Some(
            r#"{"permissions": {"allow": ["Bash"]}, "env": {"DISABLE_TELEMETRY": "1", "ANTHROPIC_BASE_URL": "https://old"}, "theme": "dark"}"#,
        ));

        provider
            .write(&Fields::new("https://new", "sk-1"), &Update::Unchanged)
            .unwrap();

        let json = read_json(&provider);
        assert_eq!(json["permissions"]["allow"][0], "Bash");
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["env"]["DISABLE_TELEMETRY"], "1");
        assert_eq!(json["env"]["ANTHROPIC_BASE_URL"], "https://new");
        assert_eq!(json["env"]["ANTHROPIC_AUTH_TOKEN"], "sk-1");

        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["permissions", "env", "theme"]);
    }

    #[test]
    fn test_write_empty_token_keeps_existing() {
        let (_dir, provider) = provider_with(Some(
            r#"{"env": {"ANTHROPIC_API_KEY": "keep-me"}}"#,
        ));

        provider
            .write(&Fields::new("https://h", ""), &Update::Unchanged)
            .unwrap();

        let json = read_json(&provider);
        assert_eq!(json["env"]["ANTHROPIC_API_KEY"], "keep-me");
        assert!(json["env"].get("ANTHROPIC_AUTH_TOKEN").is_none());
        assert_eq!(provider.read().unwrap().token, "keep-me");
    }

    #[test]
    fn test_write_clear_model_removes_key() {
        let (_dir, provider) = provider_with(Some(
            r#"{"env": {"ANTHROPIC_MODEL": "opus", "OTHER": "x"}}"#,
        ));

        provider
            .write(&Fields::new("https://h", "t"), &Update::Clear)
            .unwrap();

        let json = read_json(&provider);
        assert!(json["env"].get("ANTHROPIC_MODEL").is_none());
        assert_eq!(json["env"]["OTHER"], "x");
    }

    #[test]
    fn test_write_rejects_invalid_fields_without_touching_disk() {
        let original = r#"{"env": {"ANTHROPIC_BASE_URL": "https://old"}}"#;
        let (dir, provider) = provider_with(Some(original));

        let err = provider
            .write(&Fields::new("not a url", "t"), &Update::Unchanged)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(
            std::fs::read_to_string(&provider.settings_path).unwrap(),
            original
        );
        let entries = std::fs::read_dir(dir.path().join(".claude")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_refuses_to_clobber_malformed_file() {
        let (_dir, provider) = provider_with(Some("not json"));
        let err = provider
            .write(&Fields::new("https://h", "t"), &Update::Unchanged)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { .. }));
        assert_eq!(
            std::fs::read_to_string(&provider.settings_path).unwrap(),
            "not json"
        );
    }

    #[test]
    fn test_write_records_backup() {
        let (_dir, provider) = provider_with(Some("{}"));
        let backup = provider
            .write(&Fields::new("https://h", "t"), &Update::Unchanged)
            .unwrap();
        let copy = backup.files.get(&provider.settings_path).expect("backup");
        assert_eq!(std::fs::read_to_string(copy).unwrap(), "{}");
    }
}
