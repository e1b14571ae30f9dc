//! agtok - credential switching for AI coding agents
//!
//! Keeps an agent's base URL, API token and model in sync between a single
//! in-memory [`Fields`] value and each agent's own configuration files, and
//! manages named [`presets`] of those values per agent.
//!
//! Every file write goes through [`fs::write_atomic`] and leaves a timestamped
//! backup of the previous content next to the target.

pub mod agent_ids;
pub mod config;
pub mod error;
pub mod fields;
pub mod fs;
pub mod presets;
pub mod providers;

pub use agent_ids::AgentId;
pub use config::{AppInfo, Paths, Settings};
pub use error::{Error, Result};
pub use fields::{FieldChange, FieldName, Fields, Update, validate_fields};
pub use presets::{Preset, PresetFile, PresetStore, PresetUpdate};
pub use providers::{Backup, DiskState, Provider, Registry, Status, inspect};
