//! Handler for `loadgraph order`.

use std::path::Path;

use miette::Result;

use loadgraph_resolver::graph::QueryGraph;

use super::{resolve_manifest, ResolveOptions};

pub fn exec(manifest: &Path, opts: &ResolveOptions<'_>) -> Result<()> {
    let queries = resolve_manifest(manifest, opts)?;
    let graph = QueryGraph::from_queries(&queries);

    for (i, node) in graph.fetch_order()?.into_iter().enumerate() {
        println!("{}. {node}", i + 1);
    }
    Ok(())
}
