use agtok::{AgentId, DiskState, FieldName, Status, inspect};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{Context, display_value, mask_token, selected_agents};

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Agent to show (default: all)
    #[arg(short, long)]
    pub agent: Option<AgentId>,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the paths command
#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Agent to show (default: all)
    #[arg(short, long)]
    pub agent: Option<AgentId>,
}

#[derive(Serialize)]
pub(crate) struct AgentEntry {
    agent: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    url: String,
    token: String,
    model: String,
    active_preset: Option<String>,
    presets: usize,
    paths: Vec<String>,
}

pub(crate) fn entry_for(state: &DiskState, active_preset: Option<String>, presets: usize) -> AgentEntry {
    AgentEntry {
        agent: state.agent.to_string(),
        status: state.status.label().to_string(),
        error: match &state.status {
            Status::Error(e) => Some(e.clone()),
            _ => None,
        },
        url: state.fields.url.clone(),
        token: mask_token(&state.fields.token),
        model: state.fields.model.clone(),
        active_preset,
        presets,
        paths: state.paths.iter().map(|p| p.display().to_string()).collect(),
    }
}

pub fn run_list(args: ListArgs, ctx: &Context) -> Result<()> {
    let mut entries = Vec::new();

    for agent in selected_agents(args.agent) {
        let state = inspect(ctx.registry.provider(agent).as_ref());
        let presets = ctx.store.list(agent).and_then(|presets| {
            let active = ctx.store.find_matching(agent, &state.fields)?;
            Ok((active.map(|p| p.alias), presets.len()))
        });
        let (active, count) = match presets {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(agent = %agent, error = %e, "Failed to load presets");
                (None, 0)
            }
        };
        entries.push(entry_for(&state, active, count));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{} {}\n", ctx.app.name.bold(), ctx.app.version.dimmed());
    for e in &entries {
        let status = match e.status.as_str() {
            "OK" => e.status.green(),
            "Error" => e.status.red(),
            _ => e.status.yellow(),
        };
        println!("{} [{}]", e.agent.cyan().bold(), status);
        if let Some(error) = &e.error {
            println!("  {} {}", "✘".red(), error);
        }
        println!("  url:    {}", display_value(FieldName::Url, &e.url));
        println!(
            "  token:  {}",
            if e.token.is_empty() { "(unset)" } else { e.token.as_str() }
        );
        println!("  model:  {}", display_value(FieldName::Model, &e.model));
        match &e.active_preset {
            Some(alias) => println!("  preset: {} ({} saved)", alias.green(), e.presets),
            None => println!("  preset: {} ({} saved)", "-".dimmed(), e.presets),
        }
        println!();
    }

    Ok(())
}

pub fn run_paths(args: PathsArgs, ctx: &Context) -> Result<()> {
    for agent in selected_agents(args.agent) {
        println!("{}", agent.as_str().cyan().bold());
        for path in ctx.registry.provider(agent).paths() {
            let marker = if path.exists() { "✔".green() } else { "·".dimmed() };
            println!("  {} {}", marker, path.display());
        }
        println!(
            "  {} {} {}",
            "·".dimmed(),
            ctx.store.path_for(agent).display(),
            "(presets)".dimmed()
        );
    }
    Ok(())
}
