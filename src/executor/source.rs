//! Data source port and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::composition::JoinPlan;
use crate::error::{ObjectKind, ReportError, ReportResult};
use crate::schema::{FieldRef, SchemaCatalog};
use crate::value::{Row, Value};

/// Provider of raw joined rows, before filtering, sorting and paging.
///
/// Returned rows are keyed by qualified column key (`table.column`) and
/// must contain every requested column (absent cells read as null).
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_rows(&self, plan: &JoinPlan, columns: &[FieldRef]) -> ReportResult<Vec<Row>>;
}

/// Rows held in memory per table, joined on demand.
///
/// Table rows are stored keyed by bare column name and typed against the
/// catalog when loaded.
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    catalog: Arc<SchemaCatalog>,
    tables: HashMap<String, Vec<Row>>,
}

impl InMemoryDataSource {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            tables: HashMap::new(),
        }
    }

    /// Load a JSON document of the form `{"table": [{"column": value, ...}, ...]}`.
    pub fn from_json_str(catalog: Arc<SchemaCatalog>, content: &str) -> ReportResult<Self> {
        let document: HashMap<String, Vec<serde_json::Value>> = serde_json::from_str(content)
            .map_err(|e| ReportError::ExecutionFailure(format!("invalid data file: {}", e)))?;
        let mut source = Self::new(catalog);
        for (table, rows) in document {
            source.insert_json(&table, &rows)?;
        }
        Ok(source)
    }

    /// Append JSON object rows to a table, coercing cells by column type.
    pub fn insert_json(&mut self, table: &str, rows: &[serde_json::Value]) -> ReportResult<()> {
        let definition = self.catalog.get_table(table)?;
        let mut typed = Vec::with_capacity(rows.len());

        for json in rows {
            let object = json.as_object().ok_or_else(|| {
                ReportError::ExecutionFailure(format!("row of table '{}' is not an object", table))
            })?;
            let mut row = Row::new();
            for (key, raw) in object {
                let column = definition.column(key).ok_or_else(|| {
                    ReportError::not_found(ObjectKind::Column, format!("{}.{}", table, key))
                })?;
                let value = Value::from_json(raw, column.semantic_type).map_err(|msg| {
                    ReportError::ExecutionFailure(format!("{}.{}: {}", table, key, msg))
                })?;
                row.insert(key.clone(), value);
            }
            typed.push(row);
        }

        self.tables.entry(table.to_string()).or_default().extend(typed);
        Ok(())
    }

    /// Append already-typed rows keyed by bare column name.
    pub fn insert_rows(&mut self, table: &str, rows: Vec<Row>) -> ReportResult<()> {
        let definition = self.catalog.get_table(table)?;
        for row in &rows {
            if let Some(key) = row.keys().find(|k| !definition.has_column(k)) {
                return Err(ReportError::not_found(
                    ObjectKind::Column,
                    format!("{}.{}", table, key),
                ));
            }
        }
        self.tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|r| r.len()).unwrap_or(0)
    }

    fn qualified(table: &str, row: &Row) -> Row {
        row.iter()
            .map(|(k, v)| (format!("{}.{}", table, k), v.clone()))
            .collect()
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn fetch_rows(&self, plan: &JoinPlan, columns: &[FieldRef]) -> ReportResult<Vec<Row>> {
        for column in columns {
            if !plan.contains(&column.table) {
                return Err(ReportError::not_found(ObjectKind::Table, &column.table));
            }
        }

        let empty = Vec::new();
        let mut joined: Vec<Row> = self
            .tables
            .get(&plan.primary)
            .unwrap_or(&empty)
            .iter()
            .map(|row| Self::qualified(&plan.primary, row))
            .collect();

        // Inner equi-join along each edge, hashing the right-hand side.
        for edge in &plan.edges {
            let right_rows = self.tables.get(&edge.to_table).unwrap_or(&empty);
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, row) in right_rows.iter().enumerate() {
                if let Some(key) = row.get(&edge.to_column).and_then(Value::join_key) {
                    index.entry(key).or_default().push(i);
                }
            }

            let left_key = format!("{}.{}", edge.from_table, edge.from_column);
            let mut next = Vec::with_capacity(joined.len());
            for left in joined {
                let Some(key) = left.get(&left_key).and_then(Value::join_key) else {
                    continue;
                };
                if let Some(matches) = index.get(&key) {
                    for &i in matches {
                        let mut merged = left.clone();
                        merged.extend(Self::qualified(&edge.to_table, &right_rows[i]));
                        next.push(merged);
                    }
                }
            }
            joined = next;
        }

        let keys: Vec<String> = columns.iter().map(FieldRef::key).collect();
        Ok(joined
            .into_iter()
            .map(|mut row| {
                keys.iter()
                    .map(|k| (k.clone(), row.remove(k).unwrap_or(Value::Null)))
                    .collect()
            })
            .collect())
    }
}
