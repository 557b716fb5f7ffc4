use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::instrument;
use wbsgen::{domain::WbsNode, engine::ReconcileOutcome, storage, Config};

use super::{load_records, print_warnings, terminal::Colorize, OutputFormat};

/// Rows of each report list shown before eliding the rest.
const MAX_LISTED: usize = 20;

#[derive(Debug, Parser)]
#[command(about = "Merge a new equipment list into an existing WBS")]
pub struct Reconcile {
    /// The WBS currently in use (.json or .csv)
    tree: PathBuf,

    /// The new equipment list (.json or .csv)
    equipment: PathBuf,

    /// Write the integrated tree, with every node attribute, as JSON
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Write the three-column export as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Export only the nodes allocated by this run
    #[arg(long)]
    new_only: bool,

    /// Report format. The JSON report is written to stdout, so the tree must
    /// go to --out or --csv.
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Reconcile {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let to_stdout = self.out.is_none() && self.csv.is_none();
        if to_stdout && self.output == OutputFormat::Json {
            anyhow::bail!("--output json needs --out or --csv for the tree");
        }

        let existing = storage::load_tree(&self.tree)?;
        let (pipeline, records) = load_records(config, &self.equipment)?;
        let outcome = pipeline
            .reconcile(existing, &records)
            .with_context(|| format!("cannot reconcile against {}", self.tree.display()))?;
        if self.output == OutputFormat::Table {
            print_warnings(&outcome.warnings);
        }

        let nodes: Vec<&WbsNode> = if self.new_only {
            outcome.reconciliation.new_nodes().collect()
        } else {
            outcome.tree().iter().collect()
        };
        if let Some(path) = &self.out {
            storage::save_tree_json(path, nodes.iter().copied())?;
        }
        if let Some(path) = &self.csv {
            storage::save_tree_csv(path, nodes.iter().copied())?;
        }
        if to_stdout {
            storage::write_csv(std::io::stdout().lock(), nodes.iter().copied())
                .context("failed to write the tree to stdout")?;
        }

        match self.output {
            OutputFormat::Table => output_table(&outcome),
            OutputFormat::Json => output_json(&outcome)?,
        }
        Ok(())
    }
}

/// Written to stderr so that stdout stays a clean export.
fn output_table(outcome: &ReconcileOutcome) {
    let summary = outcome.summary();
    let reconciliation = &outcome.reconciliation;

    eprintln!("Reconciliation");
    eprintln!("{}", "──────────────".dim());
    eprintln!("Added:     {}", summary.added.to_string().success());
    eprintln!("Removed:   {}", summary.removed.to_string().warning());
    eprintln!("Modified:  {}", summary.modified.to_string().info());
    eprintln!("Unchanged: {}", summary.unchanged);
    eprintln!("Excluded:  {}", summary.excluded.to_string().dim());
    eprintln!("New nodes: {}", summary.new_nodes);

    if !reconciliation.subsystems.introduced.is_empty() {
        eprintln!();
        eprintln!(
            "New subsystems: {}",
            reconciliation.subsystems.introduced.join(", ").info()
        );
    }

    if !reconciliation.placements.is_empty() {
        eprintln!();
        eprintln!("Placed");
        for placement in reconciliation.placements.iter().take(MAX_LISTED) {
            eprintln!(
                "  {:<14} {:<20} {}",
                placement.code.to_string(),
                placement.identifier,
                placement.tier.to_string().dim()
            );
        }
        elided(reconciliation.placements.len());
    }

    if !reconciliation.comparison.modified.is_empty() {
        eprintln!();
        eprintln!("Modified (existing codes kept)");
        for modified in reconciliation.comparison.modified.iter().take(MAX_LISTED) {
            eprintln!("  {} {}", modified.identifier, format!("({})", modified.code).dim());
            for change in modified.changes.iter() {
                eprintln!("    {change}");
            }
        }
        elided(reconciliation.comparison.modified.len());
    }

    if !reconciliation.comparison.removed.is_empty() {
        eprintln!();
        eprintln!("{}", "Removed (left in the tree for review)".warning());
        for removed in reconciliation.comparison.removed.iter().take(MAX_LISTED) {
            eprintln!("  {:<14} {}", removed.code.to_string(), removed.identifier);
        }
        elided(reconciliation.comparison.removed.len());
    }

    eprintln!();
    if outcome.validation.is_valid() {
        eprintln!("{}", "✓ Integrated tree is structurally valid".success());
    }
    for issue in outcome.validation.issues() {
        eprintln!("{}", format!("✗ {issue}").warning());
    }
}

fn elided(total: usize) {
    if total > MAX_LISTED {
        eprintln!("  {}", format!("... and {} more", total - MAX_LISTED).dim());
    }
}

fn output_json(outcome: &ReconcileOutcome) -> anyhow::Result<()> {
    use serde_json::json;

    let reconciliation = &outcome.reconciliation;
    let output = json!({
        "summary": outcome.summary(),
        "placements": reconciliation.placements,
        "modified": reconciliation.comparison.modified,
        "removed": reconciliation.comparison.removed,
        "subsystems": {
            "existing": reconciliation.subsystems.existing,
            "introduced": reconciliation.subsystems.introduced,
        },
        "warnings": outcome.warnings,
        "validation": outcome.validation,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
