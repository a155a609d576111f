//! Schema catalog - tables, typed columns and declared foreign keys.
//!
//! The catalog is a pure read model. It also owns the foreign-key graph
//! used by the join resolver to link additional tables to a primary table.

mod catalog;
pub mod graph;
mod types;

pub use catalog::{CatalogDefinition, CatalogError, SchemaCatalog};
pub use graph::{JoinEdge, JoinGraph, JoinPath};
pub use types::{Column, FieldRef, ForeignKey, SemanticType, Table};
