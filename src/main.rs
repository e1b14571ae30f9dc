//! agtok CLI
//!
//! Command-line interface for switching AI agent base URLs, tokens and models.

mod commands;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use agtok::config::{self, AppInfo, Paths, Settings};
use agtok::{PresetStore, Registry};
use commands::Context;
use commands::apply::ApplyArgs;
use commands::init::InitArgs;
use commands::presets::PresetsCommand;
use commands::status::{ListArgs, PathsArgs};

#[derive(Parser)]
#[command(name = "agtok")]
#[command(
    author,
    version,
    about = "Switch base URLs, API tokens and models for AI coding agents"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Root directory holding the agents' config folders (default: your home)
    #[arg(long, global = true, env = "AGTOK_HOME")]
    home: Option<PathBuf>,

    /// Directory holding preset files
    #[arg(long, global = true, env = "AGTOK_PRESETS_DIR")]
    presets_dir: Option<PathBuf>,

    /// Settings file (default: $XDG_CONFIG_HOME/agtok/config.toml)
    #[arg(long, global = true, env = "AGTOK_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show each agent's current configuration
    List(ListArgs),

    /// Manage saved presets
    #[command(subcommand)]
    Presets(PresetsCommand),

    /// Write a preset or explicit values into an agent's config
    Apply(ApplyArgs),

    /// Save each agent's current configuration as a preset
    Init(InitArgs),

    /// Show the files agtok reads and writes
    Paths(PathsArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_context(cli: &Cli) -> Result<Context> {
    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let home = match &cli.home {
                Some(home) => home.clone(),
                None => config::user_home()?,
            };
            config::default_settings_path(&home)
        }
    };
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    let paths = Paths::resolve(cli.home.clone(), cli.presets_dir.clone(), &settings)?;
    tracing::debug!(home = %paths.home.display(), presets = %paths.presets_dir.display(), "Resolved paths");

    let app = AppInfo::from_package();
    Ok(Context {
        registry: Registry::new(paths.home),
        store: PresetStore::new(paths.presets_dir, &app),
        app,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = build_context(&cli)?;

    match cli.command {
        Commands::List(args) => commands::status::run_list(args, &ctx),
        Commands::Presets(cmd) => commands::presets::run(cmd, &ctx),
        Commands::Apply(args) => commands::apply::run_apply(args, &ctx),
        Commands::Init(args) => commands::init::run_init(args, &ctx),
        Commands::Paths(args) => commands::status::run_paths(args, &ctx),
    }
}
