use agtok::presets::now_stamp;
use agtok::{AgentId, Fields, Preset, PresetUpdate, Update, validate_fields};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use super::{Context, mask_token};

#[derive(Subcommand, Debug)]
pub enum PresetsCommand {
    /// List saved presets
    List(PresetsListArgs),
    /// Save a new preset
    Add(PresetsAddArgs),
    /// Delete a preset
    Remove(PresetsRemoveArgs),
    /// Rename a preset
    Rename(PresetsRenameArgs),
    /// Change fields of a preset
    Update(PresetsUpdateArgs),
}

#[derive(Args, Debug)]
pub struct PresetsListArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    /// Output machine-readable JSON (tokens masked)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PresetsAddArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    /// Preset name (default: current timestamp)
    #[arg(long)]
    pub alias: Option<String>,

    #[arg(long)]
    pub url: String,

    #[arg(long, default_value = "")]
    pub token: String,

    #[arg(long, default_value = "")]
    pub model: String,
}

#[derive(Args, Debug)]
pub struct PresetsRemoveArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    #[arg(long)]
    pub alias: String,
}

#[derive(Args, Debug)]
pub struct PresetsRenameArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    #[arg(long)]
    pub from: String,

    #[arg(long)]
    pub to: String,
}

#[derive(Args, Debug)]
pub struct PresetsUpdateArgs {
    #[arg(short, long)]
    pub agent: AgentId,

    /// Preset to change
    #[arg(long)]
    pub alias: String,

    /// New name for the preset
    #[arg(long)]
    pub new_alias: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub token: Option<String>,

    /// Blank the token (wins over --token)
    #[arg(long)]
    pub clear_token: bool,

    #[arg(long)]
    pub model: Option<String>,

    /// Blank the model (wins over --model)
    #[arg(long)]
    pub clear_model: bool,
}

pub fn run(cmd: PresetsCommand, ctx: &Context) -> Result<()> {
    match cmd {
        PresetsCommand::List(args) => run_list(args, ctx),
        PresetsCommand::Add(args) => run_add(args, ctx),
        PresetsCommand::Remove(args) => {
            ctx.store
                .remove(args.agent, &args.alias)
                .with_context(|| format!("Failed to remove preset '{}'", args.alias))?;
            println!("{} Removed preset '{}'", "✔".green(), args.alias);
            Ok(())
        }
        PresetsCommand::Rename(args) => {
            ctx.store
                .rename(args.agent, &args.from, &args.to)
                .with_context(|| format!("Failed to rename preset '{}'", args.from))?;
            println!(
                "{} Renamed preset '{}' -> '{}'",
                "✔".green(),
                args.from,
                args.to
            );
            Ok(())
        }
        PresetsCommand::Update(args) => run_update(args, ctx),
    }
}

fn run_list(args: PresetsListArgs, ctx: &Context) -> Result<()> {
    let presets = ctx.store.list(args.agent)?;

    if args.json {
        let masked: Vec<Preset> = presets
            .into_iter()
            .map(|p| Preset {
                token: mask_token(&p.token),
                ..p
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&masked)?);
        return Ok(());
    }

    if presets.is_empty() {
        println!("{}", "(no presets)".dimmed());
        return Ok(());
    }
    for p in &presets {
        println!(
            "{}\t{}\t{}\t{}",
            p.alias.cyan(),
            p.url,
            mask_token(&p.token),
            p.model
        );
    }
    Ok(())
}

fn run_add(args: PresetsAddArgs, ctx: &Context) -> Result<()> {
    let fields = Fields::new(args.url, args.token).with_model(args.model);
    validate_fields(&fields)?;

    let alias = args
        .alias
        .filter(|a| !a.is_empty())
        .unwrap_or_else(now_stamp);
    ctx.store
        .add(args.agent, Preset::new(alias.clone(), &fields))
        .with_context(|| format!("Failed to add preset '{alias}'"))?;

    println!("{} Added preset '{}' for {}", "✔".green(), alias, args.agent);
    Ok(())
}

fn run_update(args: PresetsUpdateArgs, ctx: &Context) -> Result<()> {
    let change = PresetUpdate {
        alias: args.new_alias,
        url: args.url,
        token: Update::from_flags(args.token, args.clear_token),
        model: Update::from_flags(args.model, args.clear_model),
    };
    ctx.store
        .update(args.agent, &args.alias, change)
        .with_context(|| format!("Failed to update preset '{}'", args.alias))?;

    println!("{} Updated preset '{}'", "✔".green(), args.alias);
    Ok(())
}
