use std::path::PathBuf;

use clap::Parser;
use tracing::instrument;
use wbsgen::{
    engine::{validate_existing, ValidationReport},
    storage,
};

use super::{terminal::Colorize, OutputFormat};

#[derive(Debug, Parser)]
#[command(about = "Check the structure of a WBS file")]
pub struct Validate {
    /// The tree to check (.json or .csv)
    tree: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let nodes = storage::load_tree(&self.tree)?;
        let count = nodes.len();
        let report = validate_existing(nodes);

        match self.output {
            OutputFormat::Table => self.output_table(&report, count),
            OutputFormat::Json => output_json(&report)?,
        }

        if !report.is_valid() {
            std::process::exit(2);
        }

        Ok(())
    }

    fn output_table(&self, report: &ValidationReport, count: usize) {
        if self.quiet {
            for issue in report.errors() {
                eprintln!("{issue}");
            }
            return;
        }

        println!("Validating {}...\n", self.tree.display());

        let errors = report.errors().count();
        if errors == 0 {
            println!("✓ Structure:  {count} nodes, no errors");
        } else {
            println!("{}", format!("✗ Structure:  {errors} errors").warning());
            for issue in report.errors() {
                println!("    {issue}");
            }
        }

        let warnings = report.warnings().count();
        if warnings == 0 {
            println!("✓ Numbering:  contiguous");
        } else {
            println!("{}", format!("⚠ Numbering:  {warnings} warnings").warning());
            for issue in report.warnings() {
                println!("    {}", issue.to_string().dim());
            }
        }

        println!();
        if report.is_valid() {
            println!("{}", "Tree is valid.".success());
        } else {
            println!("{}", "Fix the errors above before importing the tree.".dim());
        }
    }
}

fn output_json(report: &ValidationReport) -> anyhow::Result<()> {
    use serde_json::json;

    let output = json!({
        "valid": report.is_valid(),
        "errors": report.errors().count(),
        "warnings": report.warnings().count(),
        "issues": report.issues(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
