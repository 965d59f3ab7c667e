//! loadgraph CLI binary.
//!
//! Parses arguments with `clap`, loads `loadgraph.toml`, initializes logging
//! via `tracing`, and dispatches to the command handlers.

mod cli;
mod commands;

use std::path::Path;

use miette::Result;

use loadgraph_core::config::{Config, CONFIG_FILE};

fn main() -> Result<()> {
    let args = cli::parse();

    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load(Path::new(CONFIG_FILE))?,
    };

    let fallback = if args.verbose {
        "debug".to_string()
    } else {
        config.log.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::dispatch(args, &config)
}
