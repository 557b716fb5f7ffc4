use std::path::PathBuf;

use clap::Parser;
use tracing::instrument;
use wbsgen::{engine::CategorySummary, Config};

use super::{
    load_records, print_warnings,
    terminal::{is_narrow, Colorize},
    OutputFormat,
};

#[derive(Debug, Parser)]
#[command(about = "Show how an equipment list falls into categories")]
pub struct Classify {
    /// Equipment list (.json or .csv)
    equipment: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Classify {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let (pipeline, records) = load_records(config, &self.equipment)?;
        let categorized = pipeline.categorize(&records);
        print_warnings(&categorized.warnings);

        let summaries: Vec<CategorySummary> = pipeline
            .aggregate(&categorized)
            .iter()
            .map(|bucket| bucket.summary())
            .collect();
        let tbc = categorized.tbc.len();
        let excluded = categorized.excluded.len();

        match self.output {
            OutputFormat::Table => output_table(&summaries, tbc, excluded),
            OutputFormat::Json => output_json(&summaries, tbc, excluded)?,
        }
        Ok(())
    }
}

fn output_table(summaries: &[CategorySummary], tbc: usize, excluded: usize) {
    let total: usize = summaries.iter().map(|summary| summary.count).sum();

    println!("Equipment by category");
    println!("{}", "─────────────────────".dim());

    if is_narrow() {
        for summary in summaries {
            println!("{} {}: {}", summary.code, summary.name, summary.count);
        }
    } else {
        println!(
            "{:<4} {:<32} {:>6} {:>8} {:>9}",
            "Code", "Category", "Count", "Parents", "Children"
        );
        for summary in summaries {
            println!(
                "{:<4} {:<32} {:>6} {:>8} {:>9}",
                summary.code, summary.name, summary.count, summary.parents, summary.children
            );
        }
    }
    println!("Total: {total}");
    println!();
    println!("TBC:      {}", tbc.to_string().info());
    println!("Excluded: {}", excluded.to_string().dim());

    if total == 0 {
        println!();
        println!("{}", "No equipment is marked for commissioning.".warning());
    }
}

fn output_json(summaries: &[CategorySummary], tbc: usize, excluded: usize) -> anyhow::Result<()> {
    use serde_json::json;

    let output = json!({
        "categories": summaries,
        "total": summaries.iter().map(|summary| summary.count).sum::<usize>(),
        "tbc": tbc,
        "excluded": excluded,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
