use std::path::{Path, PathBuf};

mod classify;
mod generate;
mod init;
mod reconcile;
mod terminal;
mod validate;

use anyhow::Context;
use clap::ArgAction;
use classify::Classify;
use generate::Generate;
use init::Init;
use reconcile::Reconcile;
use terminal::Colorize;
use validate::Validate;
use wbsgen::{
    domain::{EquipmentRecord, Warning},
    storage, Config, Pipeline,
};

/// Configuration file picked up from the working directory when `--config`
/// is not given.
const DEFAULT_CONFIG: &str = "wbs.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file (defaults to ./wbs.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.run(self.config.as_deref())
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write the default configuration file
    Init(Init),

    /// Show how an equipment list falls into categories
    Classify(Classify),

    /// Generate a WBS from scratch
    Generate(Generate),

    /// Merge a new equipment list into an existing WBS
    ///
    /// Existing codes are never changed. New equipment is appended under its
    /// parent, its category or a new section.
    Reconcile(Reconcile),

    /// Check the structure of a WBS file
    Validate(Validate),
}

impl Command {
    fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(config)?,
            Self::Classify(command) => command.run(&load_config(config)?)?,
            Self::Generate(command) => command.run(&load_config(config)?)?,
            Self::Reconcile(command) => command.run(&load_config(config)?)?,
            Self::Validate(command) => command.run()?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Loads the configuration named on the command line, or `./wbs.toml` if it
/// exists, or the built-in defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let default = Path::new(DEFAULT_CONFIG);
    if default.exists() {
        Config::load(default)
            .with_context(|| format!("failed to load configuration from {DEFAULT_CONFIG}"))
    } else {
        tracing::debug!("no {DEFAULT_CONFIG} found, using the built-in configuration");
        Ok(Config::default())
    }
}

/// Builds the pipeline and reads and normalises an equipment list, reporting
/// normalisation warnings as it goes.
fn load_records(config: &Config, path: &Path) -> anyhow::Result<(Pipeline, Vec<EquipmentRecord>)> {
    let pipeline = Pipeline::new(config.clone()).context("invalid category table")?;
    let raw = storage::load_equipment(path)?;
    let normalized = pipeline.normalize(&raw);
    print_warnings(&normalized.warnings);
    Ok((pipeline, normalized.records))
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {warning}", "warning:".warning());
    }
}
