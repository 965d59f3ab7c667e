//! Query dependency inference: evaluates a declaration against props,
//! stabilizes it against already-resolved data, discovers which queries read
//! fields of other queries, and links them as parent and child.

pub mod graph;
pub mod inspector;
pub mod manager;
pub mod manifest;
pub mod scope;

pub use inspector::{compute_dependencies, PropInspector};
pub use manager::{PropsManager, StaticManager};
pub use manifest::Manifest;
pub use scope::{Accessor, Declaration, Scope};
