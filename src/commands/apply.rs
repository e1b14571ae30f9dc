use agtok::{AgentId, Fields, Update};
use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use super::{Context, print_changes};

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    /// Apply a saved preset
    #[arg(long, conflicts_with_all = ["url", "token", "model"], required_unless_present = "url")]
    pub alias: Option<String>,

    /// Base URL to apply directly
    #[arg(long)]
    pub url: Option<String>,

    /// API token; when omitted the current token is kept
    #[arg(long, requires = "url")]
    pub token: Option<String>,

    /// Model; when omitted the current model is kept
    #[arg(long, requires = "url")]
    pub model: Option<String>,

    /// Remove the model entry from the agent's config
    #[arg(long)]
    pub clear_model: bool,

    /// Show the changes without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Values to write plus what to do with the model entry.
pub(crate) fn target_for(args: &ApplyArgs, ctx: &Context) -> Result<(Fields, Update<String>)> {
    let fields = match &args.alias {
        Some(alias) => ctx
            .store
            .get(args.agent, alias)
            .with_context(|| format!("Failed to load preset '{alias}'"))?
            .fields(),
        None => Fields::new(
            args.url.clone().unwrap_or_default(),
            args.token.clone().unwrap_or_default(),
        )
        .with_model(args.model.clone().unwrap_or_default()),
    };
    let model = if args.clear_model {
        Update::Clear
    } else {
        Update::from_nonempty(fields.model.clone())
    };
    Ok((fields, model))
}

/// What the agent's values will be after writing `fields` with `model`.
pub(crate) fn preview(current: &Fields, fields: &Fields, model: &Update<String>) -> Fields {
    let mut next = current.clone();
    next.url = fields.url.clone();
    if !fields.token.is_empty() {
        next.token = fields.token.clone();
    }
    model.clone().apply_to(&mut next.model);
    next
}

pub fn run_apply(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let (fields, model) = target_for(&args, ctx)?;
    let provider = ctx.registry.provider(args.agent);
    provider.validate(&fields)?;

    let current = provider
        .read()
        .with_context(|| format!("Failed to read current {} config", args.agent))?;
    let next = preview(&current, &fields, &model);

    println!("{} {}", "➤ Changes for".cyan().bold(), args.agent.name().cyan().bold());
    print_changes(&current.diff(&next));

    if args.dry_run {
        println!("\n{}", "Dry run: nothing written".yellow());
        return Ok(());
    }

    let backup = provider
        .write(&fields, &model)
        .with_context(|| format!("Failed to write {} config", args.agent))?;

    for (original, copy) in &backup.files {
        println!(
            "  {} {} -> {}",
            "backup".dimmed(),
            original.display(),
            copy.display()
        );
    }
    println!("\n{}", "✨ Applied!".green().bold());
    Ok(())
}
