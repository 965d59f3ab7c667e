//! Dependency inference between the queries of a single declaration.
//!
//! Given
//!
//! ```text
//! user  = User  { id: props.id }
//! posts = Posts { author: user.name }
//! ```
//!
//! `posts` reads a field of `user` while it is built, so `posts` becomes a
//! child of `user` and must be fetched after it.

use tracing::{debug, info};

use loadgraph_core::config::ResolverConfig;
use loadgraph_core::errors::LoadError;
use loadgraph_core::props::{self, Props};
use loadgraph_core::query::QueryMap;

use crate::manager::PropsManager;
use crate::scope::{Accessor, Declaration, Scope};

/// Detects relationships between the queries produced by one declaration.
pub struct PropInspector<D> {
    declaration: D,
    config: ResolverConfig,
    accessor: Option<Accessor>,
}

impl<D: Declaration> PropInspector<D> {
    pub fn new(declaration: D) -> Self {
        Self {
            declaration,
            config: ResolverConfig::default(),
            accessor: None,
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The accessor built by the most recent resolution.
    pub fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }

    /// Evaluate the declaration and link each query to the query it reads.
    ///
    /// With a manager, the declaration is first re-evaluated against the
    /// props the manager reports until the queries stop changing. A child
    /// query whose parameters depend on an already-resolved parent would
    /// otherwise never be recomputed with that data.
    pub fn compute_dependencies(
        &mut self,
        props: &Props,
        manager: Option<&dyn PropsManager>,
    ) -> miette::Result<QueryMap> {
        let mut queries = self.evaluate(props)?;
        let mut iterations = 0;

        if let Some(manager) = manager {
            (queries, iterations) = self.stabilize(props, manager, queries)?;
        }

        let accessor = Accessor::new(props, &queries);
        let tree = {
            let mut scope = Scope::tracking(&accessor);
            self.declaration.declare(&mut scope)?
        };
        let links = link_relationships(&mut queries, &tree)?;
        self.accessor = Some(accessor);

        info!(
            queries = queries.len(),
            links, iterations, "computed query dependencies"
        );
        Ok(queries)
    }

    fn evaluate(&self, props: &Props) -> miette::Result<QueryMap> {
        let mut scope = Scope::plain(props);
        self.declaration.declare(&mut scope)
    }

    /// Re-evaluate with manager-computed props until a fixed point.
    fn stabilize(
        &self,
        props: &Props,
        manager: &dyn PropsManager,
        initial: QueryMap,
    ) -> miette::Result<(QueryMap, usize)> {
        let limit = self.config.iteration_limit();
        let mut queries = initial;
        let mut computed = manager.props(&queries);
        let mut iterations = 0;

        loop {
            iterations += 1;
            let next = self.evaluate(&props::merge(props, &computed))?;
            if next == queries {
                debug!(iterations, "queries stabilized");
                return Ok((queries, iterations));
            }
            debug!(iterations, "queries changed with computed props");
            if limit.is_some_and(|max| iterations >= max) {
                return Err(LoadError::NotConverged { iterations }.into());
            }
            queries = next;
            computed = manager.props(&queries);
        }
    }
}

/// Resolve `declaration` once with the default configuration.
pub fn compute_dependencies<D: Declaration>(
    declaration: D,
    props: &Props,
    manager: Option<&dyn PropsManager>,
) -> miette::Result<QueryMap> {
    PropInspector::new(declaration).compute_dependencies(props, manager)
}

/// Copy the dependencies recorded in `tree` onto `queries` as links.
///
/// Returns the number of links made.
fn link_relationships(queries: &mut QueryMap, tree: &QueryMap) -> miette::Result<usize> {
    let missing: Vec<String> = queries
        .names()
        .filter(|name| !tree.contains(name))
        .map(str::to_string)
        .collect();
    let extra: Vec<String> = tree
        .names()
        .filter(|name| !queries.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        return Err(LoadError::KeySetMismatch { missing, extra }.into());
    }

    let mut links = 0;
    for (_, name, node) in tree.iter() {
        let Some(parent) = node.depends_on() else {
            continue;
        };
        let child_id = queries.id_of(name).ok_or_else(|| LoadError::UnknownQuery {
            name: name.to_string(),
        })?;
        let parent_id = queries.id_of(parent).ok_or_else(|| LoadError::UnknownQuery {
            name: parent.to_string(),
        })?;
        queries.link(child_id, parent_id);
        debug!(child = name, parent, "linked queries");
        links += 1;
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgraph_core::model::Model;
    use loadgraph_core::query::Query;

    fn model(name: &str) -> Model {
        Model::new(name, ["id", "name"])
    }

    #[test]
    fn link_relationships_in_tree_order() {
        let mut queries = QueryMap::new()
            .with("user", Query::new(model("User")))
            .with("posts", Query::new(model("Post")))
            .with("likes", Query::new(model("Like")));

        let mut posts = Query::new(model("Post"));
        posts.set_depends_on("user");
        let mut likes = Query::new(model("Like"));
        likes.set_depends_on("user");
        let tree = QueryMap::new()
            .with("user", Query::new(model("User")))
            .with("likes", likes)
            .with("posts", posts);

        let links = link_relationships(&mut queries, &tree).unwrap();
        assert_eq!(links, 2);
        assert_eq!(queries.children_of("user"), vec!["likes", "posts"]);
        assert_eq!(queries.parent_of("posts"), Some("user"));
    }

    #[test]
    fn link_relationships_rejects_mismatched_names() {
        let mut queries = QueryMap::new().with("user", Query::new(model("User")));
        let tree = QueryMap::new().with("account", Query::new(model("User")));
        let err = link_relationships(&mut queries, &tree).unwrap_err();
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::KeySetMismatch { missing, extra }) => {
                assert_eq!(missing, &vec!["user".to_string()]);
                assert_eq!(extra, &vec!["account".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn link_relationships_rejects_unknown_parent() {
        let mut queries = QueryMap::new().with("posts", Query::new(model("Post")));
        let mut posts = Query::new(model("Post"));
        posts.set_depends_on("ghost");
        let tree = QueryMap::new().with("posts", posts);
        let err = link_relationships(&mut queries, &tree).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::UnknownQuery { name }) if name == "ghost"
        ));
    }
}
