//! Join resolution: turns a composition's table set into a join plan.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};
use crate::schema::{JoinEdge, JoinPath, SchemaCatalog};

/// Ordered, acyclic sequence of joins rooted at the primary table.
///
/// Derived from the composition on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub primary: String,
    pub edges: Vec<JoinEdge>,
}

impl JoinPlan {
    /// A plan that reads the primary table alone.
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            edges: Vec::new(),
        }
    }

    /// Tables in join order, starting with the primary table.
    ///
    /// Includes bridge tables that only appear on a join path.
    pub fn tables(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.edges.iter().map(|e| e.to_table.as_str()))
            .collect()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.primary == table || self.edges.iter().any(|e| e.to_table == table)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Resolves join paths against the catalog's foreign-key graph.
pub struct JoinResolver<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> JoinResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// The join path linking `table` to `primary`.
    ///
    /// Fails with `NotFound` for unknown tables and `Unjoinable` when no
    /// foreign-key path exists.
    pub fn path_to(&self, primary: &str, table: &str) -> ReportResult<JoinPath> {
        self.catalog.get_table(primary)?;
        self.catalog.get_table(table)?;
        self.catalog.join_graph().find_path(primary, table)
    }

    /// Build the join plan for a primary table and its additional tables.
    pub fn resolve(&self, primary: &str, additional: &[&str]) -> ReportResult<JoinPlan> {
        self.catalog.get_table(primary)?;
        for table in additional {
            self.catalog.get_table(table)?;
        }

        let tree = self
            .catalog
            .join_graph()
            .find_join_tree(primary, additional)
            .map_err(|err| match err {
                ReportError::Unjoinable { table, .. } => ReportError::Unjoinable {
                    table,
                    primary: primary.to_string(),
                },
                other => other,
            })?;

        Ok(JoinPlan {
            primary: primary.to_string(),
            edges: tree.edges,
        })
    }
}
