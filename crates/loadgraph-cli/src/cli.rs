//! CLI argument definitions for loadgraph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "loadgraph",
    version,
    about = "Inspect dependencies between declared data queries",
    long_about = "loadgraph evaluates a TOML query manifest, discovers which queries read \
                  fields of other queries, and shows the resulting dependency graph."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the config file (defaults to ./loadgraph.toml)
    #[arg(long, global = true, env = "LOADGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ignore the manifest's [resolved] table
    #[arg(long, global = true)]
    pub no_manager: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the query dependency tree
    Tree {
        /// Query manifest
        manifest: PathBuf,
        /// Maximum tree depth to display
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Print queries in fetch order, parents first
    Order {
        /// Query manifest
        manifest: PathBuf,
    },

    /// Show the chain of queries a query waits on
    Why {
        /// Query manifest
        manifest: PathBuf,
        /// Query name
        query: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
