//! Handler for `loadgraph why`.

use std::path::Path;

use miette::Result;

use loadgraph_resolver::graph::QueryGraph;

use super::{resolve_manifest, ResolveOptions};

pub fn exec(manifest: &Path, query: &str, opts: &ResolveOptions<'_>) -> Result<()> {
    let queries = resolve_manifest(manifest, opts)?;
    let graph = QueryGraph::from_queries(&queries);

    if graph.find(query).is_none() {
        println!("Query '{query}' not found in the manifest.");
        return Ok(());
    }
    match graph.find_path(query) {
        Some(path) => {
            println!("Path to {query}:");
            for (i, node) in path.iter().enumerate() {
                let indent = "  ".repeat(i);
                println!("{indent}{node}");
            }
        }
        None => println!("Query '{query}' is part of a dependency cycle."),
    }
    Ok(())
}
