//! Queries and the insertion-ordered arena that holds them.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::model::Model;

/// Handle of a query inside a [`QueryMap`]: its insertion index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryId(pub usize);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single data-fetch request.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub model: Arc<Model>,
    /// Parameters in insertion order.
    pub params: IndexMap<String, Value>,
    depends_on: Option<String>,
    parent: Option<QueryId>,
    children: Vec<QueryId>,
}

impl Query {
    pub fn new(model: impl Into<Arc<Model>>) -> Self {
        Self {
            model: model.into(),
            params: IndexMap::new(),
            depends_on: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Builder-style parameter assignment.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Name of the query whose field this one was built from.
    pub fn depends_on(&self) -> Option<&str> {
        self.depends_on.as_deref()
    }

    /// Record the name of the query this one depends on, replacing any
    /// earlier record.
    pub fn set_depends_on(&mut self, name: impl Into<String>) {
        self.depends_on = Some(name.into());
    }

    pub fn parent(&self) -> Option<QueryId> {
        self.parent
    }

    pub fn children(&self) -> &[QueryId] {
        &self.children
    }
}

/// Queries keyed by unique name, in insertion order.
///
/// Equality compares entries by name and ignores order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMap {
    queries: IndexMap<String, Query>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for use in declarations.
    pub fn with(mut self, name: impl Into<String>, query: Query) -> Self {
        self.insert(name, query);
        self
    }

    /// Insert or replace a query. A replaced query keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, query: Query) -> QueryId {
        let (idx, _) = self.queries.insert_full(name.into(), query);
        QueryId(idx)
    }

    pub fn get(&self, name: &str) -> Option<&Query> {
        self.queries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn id_of(&self, name: &str) -> Option<QueryId> {
        self.queries.get_index_of(name).map(QueryId)
    }

    pub fn name_of(&self, id: QueryId) -> Option<&str> {
        self.queries.get_index(id.0).map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryId, &str, &Query)> {
        self.queries
            .iter()
            .enumerate()
            .map(|(idx, (name, q))| (QueryId(idx), name.as_str(), q))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Make `child` depend on `parent`: sets the child's parent and appends
    /// the child to the parent's children.
    ///
    /// Returns `false` (and changes nothing) if either handle is out of range.
    pub fn link(&mut self, child: QueryId, parent: QueryId) -> bool {
        if child.0 >= self.len() || parent.0 >= self.len() {
            return false;
        }
        if let Some((_, q)) = self.queries.get_index_mut(child.0) {
            q.parent = Some(parent);
        }
        if let Some((_, q)) = self.queries.get_index_mut(parent.0) {
            q.children.push(child);
        }
        true
    }

    /// Name of the parent of `name`, if it has one.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(Query::parent)
            .and_then(|id| self.name_of(id))
    }

    /// Names of the children of `name`, in link order.
    pub fn children_of(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|q| {
                q.children()
                    .iter()
                    .filter_map(|&id| self.name_of(id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<(S, Query)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (S, Query)>>(iter: I) -> Self {
        let mut map = QueryMap::new();
        for (name, query) in iter {
            map.insert(name, query);
        }
        map
    }
}
