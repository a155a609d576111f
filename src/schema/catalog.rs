//! The schema catalog: read-only view of tables, columns and foreign keys.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::graph::JoinGraph;
use super::types::{Column, FieldRef, Table};
use crate::error::{ObjectKind, ReportError, ReportResult};

/// Errors raised while loading a catalog definition.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(#[from] ReportError),
}

/// On-disk catalog shape: `[[tables]]` entries with columns and foreign keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Read model over the available tables.
///
/// Loaded once per composition session and never mutated; the schema is
/// treated as static for the lifetime of a catalog instance.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    tables: Vec<Table>,
    index: HashMap<String, usize>,
    graph: JoinGraph,
}

impl SchemaCatalog {
    /// Build a catalog, validating names and foreign-key targets.
    pub fn new(tables: Vec<Table>) -> ReportResult<Self> {
        let mut index = HashMap::new();
        for (i, table) in tables.iter().enumerate() {
            if index.insert(table.name.clone(), i).is_some() {
                return Err(ReportError::DuplicateTable(table.name.clone()));
            }
            let mut seen = std::collections::HashSet::new();
            for column in &table.columns {
                if !seen.insert(column.name.as_str()) {
                    return Err(ReportError::InvalidComposition(format!(
                        "duplicate column '{}' in table '{}'",
                        column.name, table.name
                    )));
                }
            }
        }

        for table in &tables {
            for fk in &table.foreign_keys {
                if !table.has_column(&fk.column) {
                    return Err(ReportError::not_found(
                        ObjectKind::Column,
                        format!("{}.{}", table.name, fk.column),
                    ));
                }
                let target = index
                    .get(&fk.references_table)
                    .map(|&i| &tables[i])
                    .ok_or_else(|| ReportError::not_found(ObjectKind::Table, &fk.references_table))?;
                if !target.has_column(&fk.references_column) {
                    return Err(ReportError::not_found(
                        ObjectKind::Column,
                        format!("{}.{}", fk.references_table, fk.references_column),
                    ));
                }
            }
        }

        let graph = JoinGraph::from_tables(&tables);
        Ok(Self {
            tables,
            index,
            graph,
        })
    }

    pub fn from_definition(definition: CatalogDefinition) -> ReportResult<Self> {
        Self::new(definition.tables)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let definition: CatalogDefinition = toml::from_str(content)?;
        Ok(Self::from_definition(definition)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let definition: CatalogDefinition = serde_json::from_str(content)?;
        Ok(Self::from_definition(definition)?)
    }

    /// Load a catalog from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> ReportResult<&Table> {
        self.index
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| ReportError::not_found(ObjectKind::Table, name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Table names in declaration order.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Get a column of a table.
    pub fn column(&self, table: &str, column: &str) -> ReportResult<&Column> {
        self.get_table(table)?
            .column(column)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Column, format!("{}.{}", table, column)))
    }

    /// Resolve a qualified field reference to its column definition.
    pub fn resolve(&self, field: &FieldRef) -> ReportResult<&Column> {
        self.column(&field.table, &field.column)
    }

    /// The foreign-key graph over all tables.
    pub fn join_graph(&self) -> &JoinGraph {
        &self.graph
    }
}
