//! TOML manifests that declare queries without writing Rust.
//!
//! ```toml
//! [props]
//! id = 1
//!
//! [models.User]
//! fields = ["id", "name"]
//!
//! [models.Post]
//! fields = ["id", "title"]
//!
//! [queries.user]
//! model = "User"
//! params = { id = { prop = "id" } }
//!
//! [queries.posts]
//! model = "Post"
//! params = { author = { query = "user", field = "name" }, limit = 10 }
//!
//! [resolved.user]
//! name = "ana"
//! ```

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use loadgraph_core::errors::LoadError;
use loadgraph_core::model::Model;
use loadgraph_core::props::Props;
use loadgraph_core::query::{Query, QueryMap};

use crate::manager::StaticManager;
use crate::scope::{Declaration, Scope};

/// Where a query parameter takes its value from.
///
/// Tables with a `prop` key, or a `query` or `field` key, are references and
/// must match their shape exactly. Any other value is a literal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum ParamSource {
    /// An input prop.
    Prop(PropRef),
    /// A field of another query's output.
    Field(FieldRef),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropRef {
    pub prop: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRef {
    pub query: String,
    pub field: String,
}

impl TryFrom<Value> for ParamSource {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let (is_prop, is_field) = match &value {
            Value::Object(table) => (
                table.contains_key("prop"),
                table.contains_key("query") || table.contains_key("field"),
            ),
            _ => (false, false),
        };
        if is_prop {
            serde_json::from_value(value)
                .map(Self::Prop)
                .map_err(|e| format!("invalid prop reference: {e}"))
        } else if is_field {
            serde_json::from_value(value)
                .map(Self::Field)
                .map_err(|e| format!("invalid field reference: {e}"))
        } else {
            Ok(Self::Literal(value))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    props: Props,
    #[serde(default)]
    models: IndexMap<String, ModelDecl>,
    #[serde(default)]
    queries: IndexMap<String, QueryDecl>,
    #[serde(default)]
    resolved: Props,
}

#[derive(Debug, Deserialize)]
struct ModelDecl {
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryDecl {
    model: String,
    #[serde(default)]
    params: IndexMap<String, ParamSource>,
}

#[derive(Debug, Clone)]
struct QueryEntry {
    name: String,
    model: Arc<Model>,
    params: IndexMap<String, ParamSource>,
}

/// A validated manifest, usable directly as a [`Declaration`].
#[derive(Debug, Clone)]
pub struct Manifest {
    pub props: Props,
    queries: Vec<QueryEntry>,
    resolved: Props,
}

impl Manifest {
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let file: ManifestFile = toml::from_str(content).map_err(|e| LoadError::Manifest {
            message: format!("Failed to parse manifest: {e}"),
        })?;

        let models: IndexMap<String, Arc<Model>> = file
            .models
            .into_iter()
            .map(|(name, decl)| {
                let model = Arc::new(Model::new(name.clone(), decl.fields));
                (name, model)
            })
            .collect();

        let mut queries = Vec::with_capacity(file.queries.len());
        for (name, decl) in file.queries {
            let model = models.get(&decl.model).cloned().ok_or_else(|| {
                LoadError::Manifest {
                    message: format!("query `{name}` uses undeclared model `{}`", decl.model),
                }
            })?;
            queries.push(QueryEntry {
                name,
                model,
                params: decl.params,
            });
        }
        tracing::debug!(queries = queries.len(), models = models.len(), "loaded manifest");

        Ok(Self {
            props: file.props,
            queries,
            resolved: file.resolved,
        })
    }

    /// Query names in declaration order.
    pub fn query_names(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|q| q.name.as_str())
    }

    /// A manager over the `[resolved]` table, if the manifest has one.
    pub fn manager(&self) -> Option<StaticManager> {
        (!self.resolved.is_empty()).then(|| StaticManager::new(self.resolved.clone()))
    }
}

impl Declaration for Manifest {
    fn declare(&self, scope: &mut Scope<'_>) -> miette::Result<QueryMap> {
        let mut queries = QueryMap::new();
        for entry in &self.queries {
            let query = scope.construct(|cx| {
                entry.params
                    .iter()
                    .fold(Query::new(entry.model.clone()), |acc, (key, source)| {
                        let value = match source {
                            ParamSource::Prop(PropRef { prop }) => {
                                cx.prop(prop).cloned().unwrap_or(Value::Null)
                            }
                            ParamSource::Field(FieldRef { query, field }) => cx.field(query, field),
                            ParamSource::Literal(value) => value.clone(),
                        };
                        acc.with_param(key.clone(), value)
                    })
            });
            queries.insert(entry.name.clone(), query);
        }
        Ok(queries)
    }
}
