use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::instrument;
use wbsgen::Config;

use super::DEFAULT_CONFIG;

#[derive(Debug, Parser)]
#[command(about = "Write the default configuration file")]
pub struct Init {
    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let path = config.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
        if path.exists() && !self.force {
            anyhow::bail!(
                "configuration already exists at {} (use --force to overwrite)",
                path.display()
            );
        }

        Config::default()
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("Wrote default configuration to {}", path.display());
        println!();
        println!("Next steps:");
        println!("  edit the category table and field synonyms to suit your equipment list");
        println!("  wbs classify equipment.json");
        println!("  wbs generate equipment.json --project \"Your Project\" --out tree.json");
        Ok(())
    }
}
