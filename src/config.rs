//! Application identity and path configuration for agtok
//!
//! Paths are resolved from explicit overrides (CLI flags or environment),
//! then the optional `config.toml`, then platform defaults.

use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs;

/// Directory name used under the user's config directory
pub const APP_DIR_NAME: &str = "agtok";

/// Settings file name inside the app directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Preset directory name inside the app directory
pub const PRESETS_DIR_NAME: &str = "presets";

/// Name and version of the running application.
///
/// Built once at startup and handed to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity taken from this crate's package metadata.
    pub fn from_package() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Optional user settings file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root used to locate agent files (`.claude/`, `.codex/`, `.gemini/`)
    pub home: Option<PathBuf>,

    /// Directory holding the per-agent preset documents
    pub presets_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let Some(content) = fs::read_optional(path)? else {
            tracing::debug!(path = %path.display(), "No settings file");
            return Ok(Self::default());
        };
        let settings: Settings =
            toml::from_str(&content).map_err(|e| Error::malformed(path, e.message()))?;
        tracing::debug!(path = %path.display(), ?settings, "Loaded settings");
        Ok(settings)
    }
}

/// Fully resolved locations used by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub home: PathBuf,
    pub presets_dir: PathBuf,
}

impl Paths {
    /// Resolve paths; each `Some` override beats the matching setting.
    pub fn resolve(
        home: Option<PathBuf>,
        presets_dir: Option<PathBuf>,
        settings: &Settings,
    ) -> Result<Self> {
        let home = match home.or_else(|| settings.home.clone()) {
            Some(home) => home,
            None => user_home()?,
        };
        let presets_dir = presets_dir
            .or_else(|| settings.presets_dir.clone())
            .unwrap_or_else(|| default_presets_dir(&home));
        Ok(Self { home, presets_dir })
    }
}

/// The real user's home directory.
pub fn user_home() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(Error::HomeUnavailable)
}

/// `$XDG_CONFIG_HOME/agtok`, or `<home>/.config/agtok`.
pub fn app_config_dir(home: &Path) -> PathBuf {
    config_home(std::env::var_os("XDG_CONFIG_HOME"), home).join(APP_DIR_NAME)
}

/// Default settings file location for `home`.
pub fn default_settings_path(home: &Path) -> PathBuf {
    app_config_dir(home).join(CONFIG_FILE_NAME)
}

/// Default preset directory for `home`.
pub fn default_presets_dir(home: &Path) -> PathBuf {
    app_config_dir(home).join(PRESETS_DIR_NAME)
}

fn config_home(xdg: Option<OsString>, home: &Path) -> PathBuf {
    // Relative values are invalid per the XDG base directory rules.
    match xdg.map(PathBuf::from) {
        Some(dir) if dir.is_absolute() => dir,
        _ => home.join(".config"),
    }
}
