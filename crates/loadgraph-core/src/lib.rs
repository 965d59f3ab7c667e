//! Core data types for loadgraph.
//!
//! This crate defines the values the dependency resolver works on: input
//! props, model descriptors, the query arena (`QueryMap`), resolver
//! configuration, and the shared error type.
//!
//! This crate performs no resolution itself; see `loadgraph-resolver`.

pub mod config;
pub mod errors;
pub mod model;
pub mod props;
pub mod query;
