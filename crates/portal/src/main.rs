//! Portal CLI - content model tooling for portal site trees.
//!
//! Provides commands for:
//! - `summary`: Load the site and print record counts per collection
//! - `graph`: Print the item tree annotated with dependencies and unused components
//! - `watch`: Keep the content model in sync with file changes

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{GraphArgs, SummaryArgs, WatchArgs};
use output::Output;

/// Portal - content model tooling for portal site trees.
#[derive(Parser)]
#[command(name = "portal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the site and print record counts per collection.
    Summary(SummaryArgs),
    /// Print the item tree with dependencies and unused components.
    Graph(GraphArgs),
    /// Watch the site and apply every change to the content model.
    Watch(WatchArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Summary(args) => args.site.verbose,
            Self::Graph(args) => args.site.verbose,
            Self::Watch(args) => args.site.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Summary(args) => args.execute(),
        Commands::Graph(args) => args.execute(),
        Commands::Watch(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
