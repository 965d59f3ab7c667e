//! Evaluation scopes handed to declarations.
//!
//! A declaration runs against either plain props or an [`Accessor`]. Under an
//! accessor, reading a field of another query yields a placeholder value.
//! [`Scope::construct`] makes a query depend on the query it read from, either
//! during the call or earlier when the placeholder ends up in its params.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{trace, warn};

use loadgraph_core::model::Model;
use loadgraph_core::props::{field_of, Props};
use loadgraph_core::query::{Query, QueryMap};

/// A function from props to queries, evaluated once per resolution pass.
///
/// Must be deterministic and return the same query names for every scope.
pub trait Declaration {
    fn declare(&self, scope: &mut Scope<'_>) -> miette::Result<QueryMap>;
}

impl<F> Declaration for F
where
    F: Fn(&mut Scope<'_>) -> miette::Result<QueryMap>,
{
    fn declare(&self, scope: &mut Scope<'_>) -> miette::Result<QueryMap> {
        self(scope)
    }
}

/// Props extended with one field proxy per resolved query.
#[derive(Debug, Clone, Default)]
pub struct Accessor {
    props: Props,
    proxies: IndexMap<String, Arc<Model>>,
}

impl Accessor {
    pub fn new(props: &Props, queries: &QueryMap) -> Self {
        let proxies = queries
            .iter()
            .map(|(_, name, q)| (name.to_string(), q.model.clone()))
            .collect::<IndexMap<_, _>>();
        trace!(queries = proxies.len(), "built accessor");
        Self {
            props: props.clone(),
            proxies,
        }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Query names that have a proxy, in resolution order.
    pub fn query_names(&self) -> impl Iterator<Item = &str> {
        self.proxies.keys().map(String::as_str)
    }

    /// Model whose fields the proxy for `query` exposes.
    pub fn proxy(&self, query: &str) -> Option<&Model> {
        self.proxies.get(query).map(Arc::as_ref)
    }
}

fn placeholder(query: &str, field: &str) -> String {
    format!("${{{query}.{field}}}")
}

#[derive(Debug, Clone, Copy)]
enum Mode<'a> {
    Plain(&'a Props),
    Tracking(&'a Accessor),
}

/// The capability a declaration reads its inputs through.
#[derive(Debug)]
pub struct Scope<'a> {
    mode: Mode<'a>,
    /// Number of tracked reads so far.
    reads: usize,
    /// Placeholders handed out, mapped to their source query and read number.
    tracked: HashMap<String, (String, usize)>,
    /// Latest tracked read of each `construct` call in progress, innermost last.
    constructing: Vec<Option<(String, usize)>>,
}

impl<'a> Scope<'a> {
    pub fn plain(props: &'a Props) -> Self {
        Self::new(Mode::Plain(props))
    }

    pub fn tracking(accessor: &'a Accessor) -> Self {
        Self::new(Mode::Tracking(accessor))
    }

    fn new(mode: Mode<'a>) -> Self {
        Self {
            mode,
            reads: 0,
            tracked: HashMap::new(),
            constructing: Vec::new(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.mode, Mode::Tracking(_))
    }

    pub fn props(&self) -> &'a Props {
        match self.mode {
            Mode::Plain(props) => props,
            Mode::Tracking(accessor) => accessor.props(),
        }
    }

    /// Read an input prop as given.
    ///
    /// Never goes through a query proxy and never records a dependency, even
    /// in a tracking scope where `key` also names a query. Use [`Scope::field`]
    /// to read query output.
    pub fn prop(&self, key: &str) -> Option<&'a Value> {
        self.props().get(key)
    }

    /// Read `field` of the output of `query`.
    ///
    /// Plain scopes return whatever the props hold (`Null` if absent).
    /// Tracking scopes return a placeholder for fields of a known query's
    /// model and `Null` for other fields of it. Names that are not queries
    /// fall back to the props.
    pub fn field(&mut self, query: &str, field: &str) -> Value {
        let accessor = match self.mode {
            Mode::Plain(props) => return field_of(props, query, field),
            Mode::Tracking(accessor) => accessor,
        };
        let Some(model) = accessor.proxy(query) else {
            return field_of(accessor.props(), query, field);
        };
        if !model.has_field(field) {
            return Value::Null;
        }
        self.reads += 1;
        let read = (query.to_string(), self.reads);
        if let Some(slot) = self.constructing.last_mut() {
            *slot = Some(read.clone());
        }
        let value = placeholder(query, field);
        self.tracked.insert(value.clone(), read);
        Value::String(value)
    }

    /// Build one query and record its dependency.
    ///
    /// Candidates are the tracked reads made while `build` runs and the
    /// placeholders found anywhere in the built query's params, including
    /// ones read before the call. The most recent read wins.
    pub fn construct<F>(&mut self, build: F) -> Query
    where
        F: FnOnce(&mut Scope<'a>) -> Query,
    {
        self.constructing.push(None);
        let mut query = build(self);
        let read_inside = self.constructing.pop().flatten();
        if let Some(parent) = self.latest_source(&query, read_inside.as_ref()) {
            query.set_depends_on(parent);
        }
        query
    }

    fn latest_source<'s>(
        &'s self,
        query: &Query,
        read_inside: Option<&'s (String, usize)>,
    ) -> Option<String> {
        let mut sources: Vec<&(String, usize)> = read_inside.into_iter().collect();
        if !self.tracked.is_empty() {
            for value in query.params.values() {
                self.find_tracked(value, &mut sources);
            }
        }
        let (parent, _) = sources.iter().max_by_key(|read| read.1)?;
        if sources.iter().any(|read| read.0 != *parent) {
            warn!(query = %parent, "query construction reads several queries, keeping the last");
        }
        Some(parent.clone())
    }

    fn find_tracked<'s>(&'s self, value: &Value, sources: &mut Vec<&'s (String, usize)>) {
        match value {
            Value::String(s) => sources.extend(self.tracked.get(s)),
            Value::Array(items) => {
                for item in items {
                    self.find_tracked(item, sources);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.find_tracked(item, sources);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queries() -> QueryMap {
        QueryMap::new()
            .with("user", Query::new(Model::new("User", ["id", "name"])))
            .with("org", Query::new(Model::new("Org", ["slug"])))
    }

    fn props() -> Props {
        let mut props = Props::new();
        props.insert("id".into(), json!(1));
        props.insert("theme".into(), json!({ "color": "red" }));
        props
    }

    fn posts() -> Query {
        Query::new(Model::new("Post", ["title"]))
    }

    #[test]
    fn accessor_copies_props_and_fields() {
        let accessor = Accessor::new(&props(), &queries());
        assert_eq!(accessor.props()["id"], json!(1));
        assert_eq!(accessor.query_names().collect::<Vec<_>>(), vec!["user", "org"]);
        assert_eq!(accessor.proxy("user").unwrap().fields(), ["id", "name"]);
        assert!(accessor.proxy("theme").is_none());
    }

    #[test]
    fn plain_field_reads_props() {
        let mut props = props();
        props.insert("user".into(), json!({ "name": "ana" }));
        let mut scope = Scope::plain(&props);
        assert!(!scope.is_tracking());
        assert_eq!(scope.field("user", "name"), json!("ana"));
        assert_eq!(scope.field("user", "missing"), Value::Null);
        let q = scope.construct(|s| posts().with_param("author", s.field("user", "name")));
        assert!(q.depends_on().is_none());
    }

    #[test]
    fn tracked_read_records_dependency() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| posts().with_param("author", s.field("user", "name")));
        assert_eq!(q.depends_on(), Some("user"));
        assert_eq!(q.param("author"), Some(&json!("${user.name}")));
    }

    #[test]
    fn last_tracked_read_wins() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| {
            let author = s.field("user", "name");
            let org = s.field("org", "slug");
            posts().with_param("author", author).with_param("org", org)
        });
        assert_eq!(q.depends_on(), Some("org"));
    }

    #[test]
    fn unknown_field_records_nothing() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| posts().with_param("x", s.field("user", "email")));
        assert!(q.depends_on().is_none());
        assert_eq!(q.param("x"), Some(&Value::Null));
    }

    #[test]
    fn non_query_reads_plain_props() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| posts().with_param("color", s.field("theme", "color")));
        assert!(q.depends_on().is_none());
        assert_eq!(q.param("color"), Some(&json!("red")));
    }

    #[test]
    fn read_before_construct_travels_with_its_value() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let author = scope.field("user", "name");
        let q = scope.construct(|_| posts().with_param("author", author));
        assert_eq!(q.depends_on(), Some("user"));
    }

    #[test]
    fn unused_read_records_nothing() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let _ = scope.field("user", "name");
        let q = scope.construct(|_| posts().with_param("limit", 10));
        assert!(q.depends_on().is_none());
    }

    #[test]
    fn latest_read_wins_among_carried_values() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let org = scope.field("org", "slug");
        let author = scope.field("user", "name");
        let q = scope.construct(|_| posts().with_param("author", author).with_param("org", org));
        assert_eq!(q.depends_on(), Some("user"));
    }

    #[test]
    fn read_inside_construct_counts_without_being_stored() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| {
            let _ = s.field("user", "id");
            posts()
        });
        assert_eq!(q.depends_on(), Some("user"));
    }

    #[test]
    fn placeholder_nested_in_param_is_found() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let q = scope.construct(|s| {
            let filter = json!({ "authors": [s.field("user", "id")] });
            posts().with_param("filter", filter)
        });
        assert_eq!(q.depends_on(), Some("user"));
    }

    #[test]
    fn prop_does_not_go_through_proxies() {
        let mut props = props();
        props.insert("user".into(), json!({ "name": "ana" }));
        let accessor = Accessor::new(&props, &queries());
        let mut scope = Scope::tracking(&accessor);
        assert_eq!(scope.prop("user"), Some(&json!({ "name": "ana" })));
        assert_eq!(scope.field("user", "name"), json!("${user.name}"));
        let q = scope.construct(|s| posts().with_param("user", s.prop("user").cloned().unwrap_or(Value::Null)));
        assert!(q.depends_on().is_none());
    }

    #[test]
    fn nested_constructs_are_attributed_separately() {
        let accessor = Accessor::new(&props(), &queries());
        let mut scope = Scope::tracking(&accessor);
        let mut inner = None;
        let outer = scope.construct(|s| {
            inner = Some(s.construct(|s| posts().with_param("org", s.field("org", "slug"))));
            posts().with_param("author", s.field("user", "id"))
        });
        assert_eq!(outer.depends_on(), Some("user"));
        assert_eq!(inner.unwrap().depends_on(), Some("org"));
    }
}
