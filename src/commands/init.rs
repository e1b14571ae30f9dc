use agtok::presets::now_stamp;
use agtok::{AgentId, Error, Preset, validate_fields};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::{Context, selected_agents};

pub const DEFAULT_ALIAS: &str = "snap-default";

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Agent to snapshot (default: all)
    #[arg(short, long)]
    pub agent: Option<AgentId>,

    /// Alias for the new preset
    #[arg(long, default_value = DEFAULT_ALIAS)]
    pub alias: String,
}

/// Outcome of snapshotting one agent.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InitOutcome {
    Added(String),
    Duplicate(String),
    Skipped(String),
}

/// Snapshot the agent's current values into a preset.
///
/// Migration runs first with the observed model so older presets are
/// upgraded even when nothing new is added.
pub(crate) fn init_agent(agent: AgentId, alias: &str, ctx: &Context) -> Result<InitOutcome> {
    let current = ctx.registry.provider(agent).read()?;
    ctx.store.migrate_on_init(agent, &current.model)?;

    if let Err(e) = validate_fields(&current) {
        return Ok(InitOutcome::Skipped(e.to_string()));
    }
    if let Some(existing) = ctx.store.find_matching(agent, &current)? {
        return Ok(InitOutcome::Duplicate(existing.alias));
    }

    let mut alias = alias.to_string();
    match ctx.store.get(agent, &alias) {
        Ok(_) => {
            alias = format!("{alias}-{}", now_stamp());
            tracing::warn!(agent = %agent, %alias, "Alias already exists, using a timestamped alias");
        }
        Err(Error::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    ctx.store.add(agent, Preset::new(alias.clone(), &current))?;
    Ok(InitOutcome::Added(alias))
}

pub fn run_init(args: InitArgs, ctx: &Context) -> Result<()> {
    let agents = selected_agents(args.agent);
    let mut failures = 0usize;

    for agent in &agents {
        let tag = format!("[{agent}]");
        match init_agent(*agent, &args.alias, ctx) {
            Ok(InitOutcome::Added(alias)) => {
                println!("{} {} added preset '{}'", "✔".green(), tag.cyan(), alias);
            }
            Ok(InitOutcome::Duplicate(alias)) => {
                println!(
                    "{} {} identical preset already exists (alias: {}), skipped",
                    "·".dimmed(),
                    tag.cyan(),
                    alias
                );
            }
            Ok(InitOutcome::Skipped(reason)) => {
                println!(
                    "{} {} skip: current config invalid ({})",
                    "!".yellow(),
                    tag.cyan(),
                    reason
                );
            }
            Err(e) => {
                tracing::error!(agent = %agent, error = %e, "Init failed");
                eprintln!("{} {} {:#}", "✘".red(), tag.cyan(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("init failed for {} of {} agent(s)", failures, agents.len());
    }
    Ok(())
}
