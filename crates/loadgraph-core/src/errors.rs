use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all loadgraph operations.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    /// Configuration file could not be read or parsed.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check loadgraph.toml for syntax errors"))]
    Config { message: String },

    /// Invalid or malformed declaration manifest.
    #[error("Manifest error: {message}")]
    Manifest { message: String },

    /// A declaration function failed while producing its queries.
    #[error("Declaration failed: {message}")]
    Declaration { message: String },

    /// Stabilization hit the iteration limit without reaching a fixed point.
    #[error("Queries did not stabilize after {iterations} iterations")]
    #[diagnostic(help(
        "The declaration must produce the same queries once given enough upstream data; \
         raise `resolver.max-iterations` or set it to 0 to remove the limit"
    ))]
    NotConverged { iterations: usize },

    /// A relationship names a query that is not in the resolved map.
    #[error("Unknown query `{name}`")]
    UnknownQuery { name: String },

    /// The tracking pass produced a different set of query names.
    #[error("Declaration returned different queries when tracked (missing: [{}], extra: [{}])", missing.join(", "), extra.join(", "))]
    #[diagnostic(help("A declaration must return the same query names for every input"))]
    KeySetMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Parent links form a cycle, so no fetch order exists.
    #[error("Dependency cycle involving query `{query}`")]
    Cycle { query: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type LoadResult<T> = miette::Result<T>;
