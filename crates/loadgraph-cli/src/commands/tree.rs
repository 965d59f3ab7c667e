//! Handler for `loadgraph tree`.

use std::path::Path;

use miette::Result;

use loadgraph_resolver::graph::QueryGraph;

use super::{resolve_manifest, ResolveOptions};

pub fn exec(manifest: &Path, depth: Option<usize>, opts: &ResolveOptions<'_>) -> Result<()> {
    let queries = resolve_manifest(manifest, opts)?;
    let graph = QueryGraph::from_queries(&queries);

    if graph.is_empty() {
        println!("No queries declared.");
        return Ok(());
    }
    print!("{}", graph.print_tree(depth));
    Ok(())
}
