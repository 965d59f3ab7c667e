//! Query dependency graph construction and traversal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;

use loadgraph_core::errors::LoadError;
use loadgraph_core::query::QueryMap;

/// A node in the query graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct QueryNode {
    pub name: String,
    pub model: String,
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// Parent-to-child edges between resolved queries, backed by petgraph.
///
/// Node indices follow the query map's insertion order.
pub struct QueryGraph {
    graph: DiGraph<QueryNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl QueryGraph {
    pub fn from_queries(queries: &QueryMap) -> Self {
        let mut graph = DiGraph::with_capacity(queries.len(), queries.len());
        let mut index = HashMap::new();
        for (_, name, query) in queries.iter() {
            let idx = graph.add_node(QueryNode {
                name: name.to_string(),
                model: query.model.name.clone(),
            });
            index.insert(name.to_string(), idx);
        }
        for (id, _, query) in queries.iter() {
            if let Some(parent) = query.parent() {
                graph.add_edge(NodeIndex::new(parent.0), NodeIndex::new(id.0), ());
            }
        }
        Self { graph, index }
    }

    /// Look up a node by query name.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &QueryNode {
        &self.graph[idx]
    }

    /// Queries that depend on nothing, in declaration order.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.parent_of(idx).is_none())
            .collect()
    }

    pub fn parent_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Queries that read from `idx`, in declaration order.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        deps.sort();
        deps
    }

    /// Every query ordered so that parents come before their children.
    pub fn fetch_order(&self) -> miette::Result<Vec<&QueryNode>> {
        let order = toposort(&self.graph, None).map_err(|cycle| LoadError::Cycle {
            query: self.graph[cycle.node_id()].name.clone(),
        })?;
        Ok(order.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    /// Chain of queries from a root down to `name`.
    pub fn find_path(&self, name: &str) -> Option<Vec<&QueryNode>> {
        let mut current = self.find(name)?;
        let mut path = vec![current];
        let mut visited = HashSet::from([current]);
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent) {
                return None;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Some(path.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    /// Render the graph as a tree under its root queries.
    ///
    /// Queries unreachable from any root (parents forming a cycle) are listed
    /// afterwards, marked `[cycle]`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let mut visited = HashSet::new();

        for root in self.roots() {
            output.push_str(&format!("{}\n", self.graph[root]));
            visited.insert(root);
            let children = self.dependents_of(root);
            let count = children.len();
            for (i, child) in children.into_iter().enumerate() {
                let is_last = i == count - 1;
                self.print_subtree(&mut output, child, "", is_last, 1, max_depth, &mut visited);
            }
        }

        let mut reachable = HashSet::new();
        for root in self.roots() {
            let mut dfs = Dfs::new(&self.graph, root);
            while let Some(idx) = dfs.next(&self.graph) {
                reachable.insert(idx);
            }
        }
        for idx in self.graph.node_indices() {
            if !reachable.contains(&idx) {
                output.push_str(&format!("{} [cycle]\n", self.graph[idx]));
            }
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if !visited.insert(idx) {
            return;
        }
        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.dependents_of(idx);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                child,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }
    }

    /// Number of queries.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgraph_core::model::Model;
    use loadgraph_core::query::{Query, QueryId};

    fn query(model: &str) -> Query {
        Query::new(Model::new(model, ["id"]))
    }

    /// user -> posts -> comments, user -> likes, tags standalone.
    fn sample() -> QueryMap {
        let mut map = QueryMap::new()
            .with("user", query("User"))
            .with("posts", query("Post"))
            .with("comments", query("Comment"))
            .with("likes", query("Like"))
            .with("tags", query("Tag"));
        map.link(QueryId(1), QueryId(0));
        map.link(QueryId(2), QueryId(1));
        map.link(QueryId(3), QueryId(0));
        map
    }

    #[test]
    fn roots_and_dependents() {
        let g = QueryGraph::from_queries(&sample());
        let roots: Vec<&str> = g.roots().into_iter().map(|i| g.node(i).name.as_str()).collect();
        assert_eq!(roots, vec!["user", "tags"]);

        let user = g.find("user").unwrap();
        let deps: Vec<&str> = g
            .dependents_of(user)
            .into_iter()
            .map(|i| g.node(i).name.as_str())
            .collect();
        assert_eq!(deps, vec!["posts", "likes"]);
    }

    #[test]
    fn fetch_order_puts_parents_first() {
        let g = QueryGraph::from_queries(&sample());
        let order: Vec<&str> = g
            .fetch_order()
            .unwrap()
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert_eq!(order.len(), 5);
        assert!(pos("user") < pos("posts"));
        assert!(pos("posts") < pos("comments"));
        assert!(pos("user") < pos("likes"));
    }

    #[test]
    fn fetch_order_reports_cycles() {
        let mut map = QueryMap::new().with("a", query("A")).with("b", query("B"));
        map.link(QueryId(0), QueryId(1));
        map.link(QueryId(1), QueryId(0));
        let g = QueryGraph::from_queries(&map);
        let err = g.fetch_order().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::Cycle { .. })
        ));
        assert!(g.print_tree(None).contains("[cycle]"));
    }

    #[test]
    fn tree_printing() {
        let g = QueryGraph::from_queries(&sample());
        let tree = g.print_tree(None);
        assert_eq!(
            tree,
            "user (User)\n\
             ├── posts (Post)\n\
             │   └── comments (Comment)\n\
             └── likes (Like)\n\
             tags (Tag)\n"
        );
    }

    #[test]
    fn tree_respects_max_depth() {
        let g = QueryGraph::from_queries(&sample());
        let tree = g.print_tree(Some(1));
        assert!(tree.contains("posts (Post)"));
        assert!(!tree.contains("comments"));
    }

    #[test]
    fn find_path_walks_up_to_root() {
        let g = QueryGraph::from_queries(&sample());
        let path: Vec<&str> = g
            .find_path("comments")
            .unwrap()
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(path, vec!["user", "posts", "comments"]);
        assert!(g.find_path("missing").is_none());
    }
}
