//! The props-manager collaborator used during stabilization.

use loadgraph_core::props::Props;
use loadgraph_core::query::QueryMap;

/// Supplies the props a set of queries would expose once resolved.
///
/// Implementations that cache or count calls should use interior mutability.
pub trait PropsManager {
    fn props(&self, queries: &QueryMap) -> Props;
}

impl<F> PropsManager for F
where
    F: Fn(&QueryMap) -> Props,
{
    fn props(&self, queries: &QueryMap) -> Props {
        self(queries)
    }
}

/// A fixed snapshot of already-fetched query outputs.
///
/// Only outputs whose query name appears in the candidate map are reported.
#[derive(Debug, Clone, Default)]
pub struct StaticManager {
    resolved: Props,
}

impl StaticManager {
    pub fn new(resolved: Props) -> Self {
        Self { resolved }
    }
}

impl PropsManager for StaticManager {
    fn props(&self, queries: &QueryMap) -> Props {
        self.resolved
            .iter()
            .filter(|(name, _)| queries.contains(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
