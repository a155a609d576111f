//! The persisted preference record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::composition::ReportComposition;
use crate::error::{ReportError, ReportResult};
use crate::executor::SortSpec;
use crate::filter::FilterGroup;
use crate::schema::SchemaCatalog;

/// Selected columns of one table, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreference {
    pub name: String,
    #[serde(default)]
    pub selected_columns: Vec<String>,
}

/// Snapshot of a report's composition, filters and sort.
///
/// Stored with the same JSON shape in the local store and the remote
/// backup:
///
/// ```json
/// {
///   "reportId": "employee-directory",
///   "primaryTable": "employees",
///   "tables": [{"name": "employees", "selectedColumns": ["first_name"]}],
///   "filters": {"id": "...", "combinator": "AND", "children": []},
///   "sort": {"column": "employees.first_name", "direction": "asc"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    pub report_id: String,
    pub primary_table: String,
    pub tables: Vec<TablePreference>,
    #[serde(default)]
    pub filters: FilterGroup,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl PreferenceRecord {
    /// Capture session state.
    pub fn from_state(
        report_id: &str,
        composition: &ReportComposition,
        filters: &FilterGroup,
        sort: Option<&SortSpec>,
    ) -> Self {
        Self {
            report_id: report_id.to_string(),
            primary_table: composition.primary().to_string(),
            tables: composition
                .tables()
                .iter()
                .map(|t| TablePreference {
                    name: t.name.clone(),
                    selected_columns: t.selected.clone(),
                })
                .collect(),
            filters: filters.clone(),
            sort: sort.cloned(),
        }
    }

    /// The record of a report nobody customized: primary table only, no
    /// selection, no filters, no sort.
    pub fn default_for(report_id: &str, primary_table: &str) -> Self {
        Self {
            report_id: report_id.to_string(),
            primary_table: primary_table.to_string(),
            tables: vec![TablePreference {
                name: primary_table.to_string(),
                selected_columns: Vec::new(),
            }],
            filters: FilterGroup::default(),
            sort: None,
        }
    }

    pub fn selected_column_count(&self) -> usize {
        self.tables.iter().map(|t| t.selected_columns.len()).sum()
    }

    /// Rebuild a composition, filters and sort against the catalog.
    ///
    /// Tables are re-added in their saved order, so a saved table that lost
    /// its join path fails with `Unjoinable`. Filters and sort must still
    /// fit the rebuilt composition.
    pub fn restore(
        &self,
        catalog: &SchemaCatalog,
    ) -> ReportResult<(ReportComposition, FilterGroup, Option<SortSpec>)> {
        let mut composition = ReportComposition::new(catalog, &self.primary_table)?;
        for table in &self.tables {
            if table.name != self.primary_table {
                composition.add_table(catalog, &table.name)?;
            }
            composition.set_selection(catalog, &table.name, &table.selected_columns)?;
        }

        self.filters.validate(&composition, catalog)?;
        if let Some(sort) = &self.sort {
            if !composition.contains_table(&sort.column.table) {
                return Err(ReportError::InvalidComposition(format!(
                    "sort column '{}' is not part of the report",
                    sort.column
                )));
            }
            catalog.resolve(&sort.column)?;
        }

        Ok((composition, self.filters.clone(), self.sort.clone()))
    }

    /// SHA-256 of the record's JSON, as 64 lowercase hex chars.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&json)))
    }
}
