//! Command dispatch and handler modules.

mod order;
mod tree;
mod why;

use std::path::Path;

use miette::Result;

use loadgraph_core::config::Config;
use loadgraph_core::query::QueryMap;
use loadgraph_resolver::{Manifest, PropInspector, PropsManager};

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli, config: &Config) -> Result<()> {
    let opts = ResolveOptions {
        config,
        use_manager: !cli.no_manager,
    };
    match cli.command {
        Command::Tree { manifest, depth } => tree::exec(&manifest, depth, &opts),
        Command::Order { manifest } => order::exec(&manifest, &opts),
        Command::Why { manifest, query } => why::exec(&manifest, &query, &opts),
    }
}

/// Settings shared by every command that resolves a manifest.
pub struct ResolveOptions<'a> {
    pub config: &'a Config,
    pub use_manager: bool,
}

/// Load a manifest and compute its query dependencies.
pub fn resolve_manifest(path: &Path, opts: &ResolveOptions<'_>) -> Result<QueryMap> {
    let manifest = Manifest::from_path(path)?;
    let props = manifest.props.clone();
    let manager = if opts.use_manager {
        manifest.manager()
    } else {
        None
    };

    let mut inspector = PropInspector::new(manifest).with_config(opts.config.resolver.clone());
    inspector.compute_dependencies(&props, manager.as_ref().map(|m| m as &dyn PropsManager))
}
