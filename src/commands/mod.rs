//! Subcommand implementations for the `agtok` binary.

pub mod apply;
pub mod init;
pub mod presets;
pub mod status;

use agtok::{AgentId, AppInfo, FieldChange, FieldName, PresetStore, Registry};
use colored::Colorize;

/// Everything a subcommand needs, resolved once in `main`.
pub struct Context {
    pub app: AppInfo,
    pub registry: Registry,
    pub store: PresetStore,
}

/// The requested agent, or every supported agent.
pub fn selected_agents(agent: Option<AgentId>) -> Vec<AgentId> {
    match agent {
        Some(agent) => vec![agent],
        None => AgentId::all().to_vec(),
    }
}

/// Hide all but the last four characters of a secret.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// Display form of a field value: masked for tokens, `(unset)` when empty.
pub fn display_value(field: FieldName, value: &str) -> String {
    if value.is_empty() {
        return "(unset)".to_string();
    }
    match field {
        FieldName::Token => mask_token(value),
        _ => value.to_string(),
    }
}

pub fn print_changes(changes: &[FieldChange]) {
    if changes.is_empty() {
        println!("  {}", "(no change)".dimmed());
        return;
    }
    for change in changes {
        println!(
            "  {:<6} {} -> {}",
            format!("{}:", change.field.as_str()),
            display_value(change.field, &change.before).red(),
            display_value(change.field, &change.after).green()
        );
    }
}
