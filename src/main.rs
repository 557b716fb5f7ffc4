//! `wbs`: build and maintain a scheduling-tool WBS from an equipment list.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() {
    if let Err(error) = Cli::parse().run() {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
