use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::instrument;
use wbsgen::{
    engine::{GenerateSummary, ValidationReport},
    storage, Config,
};

use super::{load_records, print_warnings, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Generate a WBS from scratch")]
pub struct Generate {
    /// Equipment list (.json or .csv)
    equipment: PathBuf,

    /// Project name for the root node (defaults to the configured name)
    #[arg(long)]
    project: Option<String>,

    /// Write the tree, with every node attribute, as JSON
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Write the three-column export as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
}

impl Generate {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let (pipeline, records) = load_records(config, &self.equipment)?;
        let outcome = pipeline.generate(&records, self.project.as_deref());
        print_warnings(&outcome.warnings);

        if let Some(path) = &self.out {
            storage::save_tree_json(path, &outcome.tree)?;
        }
        if let Some(path) = &self.csv {
            storage::save_tree_csv(path, &outcome.tree)?;
        }
        if self.out.is_none() && self.csv.is_none() {
            storage::write_csv(std::io::stdout().lock(), &outcome.tree)
                .context("failed to write the tree to stdout")?;
        }

        report(&outcome.summary(), &outcome.validation);
        Ok(())
    }
}

/// The run summary goes to stderr so that stdout stays a clean export.
fn report(summary: &GenerateSummary, validation: &ValidationReport) {
    eprintln!(
        "{} {} nodes, {} equipment, {} TBC, {} excluded",
        "✓ Generated".success(),
        summary.nodes,
        summary.equipment,
        summary.tbc,
        summary.excluded,
    );
    if summary.warnings > 0 {
        eprintln!(
            "{}",
            format!("⚠ {} data-quality warnings", summary.warnings).warning()
        );
    }
    for issue in validation.issues() {
        eprintln!("{}", format!("✗ {issue}").warning());
    }
}
