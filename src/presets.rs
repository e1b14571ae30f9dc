//! Named presets per agent, persisted as one versioned JSON document each.
//!
//! Every mutation loads the whole document, changes the in-memory list and
//! writes the whole document back atomically. Each write stamps
//! `config_version` with the running application version.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::agent_ids::AgentId;
use crate::config::AppInfo;
use crate::error::{Error, Result};
use crate::fields::{Fields, Update, validate_url};
use crate::fs::{self, PRIVATE_FILE_MODE};

/// Oldest schema version; documents at this version may predate `model`.
pub const SCHEMA_VERSION_V1: u32 = 1;

/// Schema version written for new documents.
pub const CURRENT_SCHEMA_VERSION: u32 = SCHEMA_VERSION_V1;

/// `added_at` timestamp format.
const ADDED_AT_FORMAT: &str = "%Y%m%d-%H%M";

/// A saved set of values for one agent. Aliases are unique per agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub alias: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub added_at: String,
}

impl Preset {
    /// A preset stamped with the current local time.
    pub fn new(alias: impl Into<String>, fields: &Fields) -> Self {
        Self {
            alias: alias.into(),
            url: fields.url.clone(),
            token: fields.token.clone(),
            model: fields.model.clone(),
            added_at: now_stamp(),
        }
    }

    pub fn fields(&self) -> Fields {
        Fields {
            url: self.url.clone(),
            token: self.token.clone(),
            model: self.model.clone(),
        }
    }
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config_version: String,
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl Default for PresetFile {
    fn default() -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            config_version: String::new(),
            presets: Vec::new(),
        }
    }
}

impl PresetFile {
    fn position(&self, alias: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.alias == alias)
    }

    fn require(&self, alias: &str) -> Result<usize> {
        self.position(alias)
            .ok_or_else(|| Error::NotFound(alias.to_string()))
    }

    /// Fail if `alias` belongs to any entry other than the one at `except`.
    fn ensure_free(&self, alias: &str, except: Option<usize>) -> Result<()> {
        match self.position(alias) {
            Some(i) if Some(i) != except => Err(Error::AliasExists(alias.to_string())),
            _ => Ok(()),
        }
    }
}

/// Field changes for [`PresetStore::update`].
#[derive(Debug, Clone, Default)]
pub struct PresetUpdate {
    /// New alias; `None` or empty keeps the current one.
    pub alias: Option<String>,
    pub url: Option<String>,
    pub token: Update<String>,
    pub model: Update<String>,
}

/// Preset documents under one directory, `<dir>/<agent>.json`.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
    app_version: String,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>, app: &AppInfo) -> Self {
        Self {
            dir: dir.into(),
            app_version: app.version.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, agent: AgentId) -> PathBuf {
        self.dir.join(format!("{}.json", agent.as_str()))
    }

    /// The agent's document; a missing file is an empty version-1 document.
    pub fn load(&self, agent: AgentId) -> Result<PresetFile> {
        let path = self.path_for(agent);
        let Some(content) = fs::read_optional(&path)? else {
            return Ok(PresetFile::default());
        };
        let mut doc: PresetFile =
            serde_json::from_str(&content).map_err(|e| Error::malformed(&path, e))?;
        if doc.version == 0 {
            doc.version = SCHEMA_VERSION_V1;
        }
        Ok(doc)
    }

    pub fn list(&self, agent: AgentId) -> Result<Vec<Preset>> {
        Ok(self.load(agent)?.presets)
    }

    fn save(&self, agent: AgentId, mut doc: PresetFile) -> Result<()> {
        if doc.version == 0 {
            doc.version = SCHEMA_VERSION_V1;
        }
        doc.config_version = self.app_version.clone();

        let path = self.path_for(agent);
        let mut body =
            serde_json::to_string_pretty(&doc).map_err(|e| Error::malformed(&path, e))?;
        body.push('\n');
        fs::write_atomic(&path, body.as_bytes(), PRIVATE_FILE_MODE)?;

        tracing::debug!(
            agent = %agent,
            presets = doc.presets.len(),
            path = %path.display(),
            "Saved presets"
        );
        Ok(())
    }

    pub fn add(&self, agent: AgentId, preset: Preset) -> Result<()> {
        ensure_alias(&preset.alias)?;
        let mut doc = self.load(agent)?;
        doc.ensure_free(&preset.alias, None)?;
        tracing::info!(agent = %agent, alias = %preset.alias, "Adding preset");
        doc.presets.push(preset);
        self.save(agent, doc)
    }

    pub fn get(&self, agent: AgentId, alias: &str) -> Result<Preset> {
        let doc = self.load(agent)?;
        let idx = doc.require(alias)?;
        Ok(doc.presets[idx].clone())
    }

    /// The first preset whose URL and token both equal `fields`.
    pub fn find_matching(&self, agent: AgentId, fields: &Fields) -> Result<Option<Preset>> {
        Ok(self
            .load(agent)?
            .presets
            .into_iter()
            .find(|p| p.url == fields.url && p.token == fields.token))
    }

    pub fn remove(&self, agent: AgentId, alias: &str) -> Result<()> {
        let mut doc = self.load(agent)?;
        let idx = doc.require(alias)?;
        doc.presets.remove(idx);
        tracing::info!(agent = %agent, alias = %alias, "Removed preset");
        self.save(agent, doc)
    }

    /// Rename `old` to `new`. Renaming an entry to its own alias is a no-op.
    pub fn rename(&self, agent: AgentId, old: &str, new: &str) -> Result<()> {
        ensure_alias(new)?;
        let mut doc = self.load(agent)?;
        let idx = doc.require(old)?;
        if old == new {
            return Ok(());
        }
        doc.ensure_free(new, Some(idx))?;
        doc.presets[idx].alias = new.to_string();
        tracing::info!(agent = %agent, from = %old, to = %new, "Renamed preset");
        self.save(agent, doc)
    }

    /// Apply a tri-state update to the preset named `alias`.
    pub fn update(&self, agent: AgentId, alias: &str, change: PresetUpdate) -> Result<()> {
        let mut doc = self.load(agent)?;
        let idx = doc.require(alias)?;

        let new_alias = change.alias.filter(|a| !a.is_empty());
        if let Some(new_alias) = &new_alias {
            ensure_alias(new_alias)?;
            doc.ensure_free(new_alias, Some(idx))?;
        }
        if let Some(url) = &change.url {
            validate_url(url)?;
        }

        let preset = &mut doc.presets[idx];
        if let Some(new_alias) = new_alias {
            preset.alias = new_alias;
        }
        if let Some(url) = change.url {
            preset.url = url;
        }
        change.token.apply_to(&mut preset.token);
        change.model.apply_to(&mut preset.model);

        tracing::info!(agent = %agent, alias = %alias, "Updated preset");
        self.save(agent, doc)
    }

    /// One-time upgrade run on init.
    ///
    /// A version-1 document gets every blank `model` back-filled with
    /// `observed_model`. Any document is then written back, which stamps the
    /// current `config_version` even when nothing else changed.
    pub fn migrate_on_init(&self, agent: AgentId, observed_model: &str) -> Result<()> {
        let mut doc = self.load(agent)?;
        if doc.version == SCHEMA_VERSION_V1 && !observed_model.is_empty() {
            let mut filled = 0;
            for preset in doc.presets.iter_mut().filter(|p| p.model.is_empty()) {
                preset.model = observed_model.to_string();
                filled += 1;
            }
            if filled > 0 {
                tracing::info!(agent = %agent, filled, model = %observed_model, "Back-filled preset models");
            }
        }
        self.save(agent, doc)
    }
}

fn ensure_alias(alias: &str) -> Result<()> {
    if alias.trim().is_empty() {
        return Err(Error::InvalidConfig("alias must not be empty".to_string()));
    }
    Ok(())
}

/// Local time formatted for `added_at` and generated aliases.
pub fn now_stamp() -> String {
    Local::now().format(ADDED_AT_FORMAT).to_string()
}
