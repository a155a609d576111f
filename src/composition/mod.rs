//! Report composition - the table set and per-table column selection.
//!
//! A composition always contains its primary table, listed first. Additional
//! tables are admitted only when the join resolver finds a foreign-key path
//! to the primary table. Every failed operation leaves the composition
//! unchanged.

mod join;

use std::collections::HashSet;
use std::fmt;

pub use join::{JoinPlan, JoinResolver};

use crate::error::{ObjectKind, ReportError, ReportResult};
use crate::filter::FilterGroup;
use crate::schema::{FieldRef, SchemaCatalog};

/// Selected columns of one included table, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelection {
    pub name: String,
    pub selected: Vec<String>,
}

impl TableSelection {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selected: Vec::new(),
        }
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selected.iter().any(|c| c == column)
    }
}

/// Selected-versus-total column counter for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCounter {
    pub selected: usize,
    pub total: usize,
}

impl fmt::Display for ColumnCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} columns selected", self.selected, self.total)
    }
}

/// What a cascading table removal took with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeSummary {
    pub table: String,
    pub removed_columns: usize,
    pub removed_conditions: usize,
}

/// The tables and columns a report reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportComposition {
    primary: String,
    /// Included tables; index 0 is always the primary table.
    tables: Vec<TableSelection>,
}

impl ReportComposition {
    /// Start a composition with only the primary table and no selection.
    pub fn new(catalog: &SchemaCatalog, primary: &str) -> ReportResult<Self> {
        catalog.get_table(primary)?;
        Ok(Self {
            primary: primary.to_string(),
            tables: vec![TableSelection::new(primary)],
        })
    }

    /// Start a composition with every primary-table column selected.
    pub fn with_all_columns(catalog: &SchemaCatalog, primary: &str) -> ReportResult<Self> {
        let mut composition = Self::new(catalog, primary)?;
        composition.select_all(catalog, primary)?;
        Ok(composition)
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn tables(&self) -> &[TableSelection] {
        &self.tables
    }

    /// Included table names, primary first.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Additional (non-primary) table names in insertion order.
    pub fn additional_tables(&self) -> Vec<&str> {
        self.tables[1..].iter().map(|t| t.name.as_str()).collect()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.name == table)
    }

    /// Whether the remove action is available for a table.
    pub fn can_remove(&self, table: &str) -> bool {
        table != self.primary && self.contains_table(table)
    }

    fn position(&self, table: &str) -> ReportResult<usize> {
        self.tables
            .iter()
            .position(|t| t.name == table)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Table, table))
    }

    pub fn selection(&self, table: &str) -> ReportResult<&TableSelection> {
        let idx = self.position(table)?;
        Ok(&self.tables[idx])
    }

    // =========================================================================
    // Table set
    // =========================================================================

    /// Add a table linked to the primary table by foreign keys.
    ///
    /// The new table starts with no columns selected.
    pub fn add_table(&mut self, catalog: &SchemaCatalog, table: &str) -> ReportResult<()> {
        catalog.get_table(table)?;
        if self.contains_table(table) {
            return Err(ReportError::DuplicateTable(table.to_string()));
        }

        let path = JoinResolver::new(catalog).path_to(&self.primary, table)?;
        tracing::debug!(
            primary = %self.primary,
            table,
            hops = path.len(),
            "table added to composition"
        );

        self.tables.push(TableSelection::new(table));
        Ok(())
    }

    /// Remove a non-primary table and its column selection.
    ///
    /// Returns how many selected columns were dropped. Filter conditions are
    /// not touched here; use [`remove_table_cascade`] to keep them in sync.
    pub fn remove_table(&mut self, table: &str) -> ReportResult<usize> {
        if table == self.primary {
            return Err(ReportError::PrimaryTableProtected(table.to_string()));
        }
        let idx = self.position(table)?;
        let removed = self.tables.remove(idx);
        tracing::debug!(table, columns = removed.selected.len(), "table removed from composition");
        Ok(removed.selected.len())
    }

    /// Derive the join plan for the current table set.
    pub fn join_plan(&self, catalog: &SchemaCatalog) -> ReportResult<JoinPlan> {
        JoinResolver::new(catalog).resolve(&self.primary, &self.additional_tables())
    }

    // =========================================================================
    // Column selection
    // =========================================================================

    /// Select every column of a table.
    ///
    /// Already-selected columns keep their order; the rest are appended in
    /// catalog order. Applying it twice is the same as applying it once.
    pub fn select_all(&mut self, catalog: &SchemaCatalog, table: &str) -> ReportResult<()> {
        let idx = self.position(table)?;
        let definition = catalog.get_table(table)?;
        let selection = &mut self.tables[idx];
        for column in definition.column_names() {
            if !selection.is_selected(column) {
                selection.selected.push(column.to_string());
            }
        }
        Ok(())
    }

    /// Deselect every column of a table.
    pub fn deselect_all(&mut self, table: &str) -> ReportResult<()> {
        let idx = self.position(table)?;
        self.tables[idx].selected.clear();
        Ok(())
    }

    /// Flip one column's selection. Newly selected columns go last.
    ///
    /// Returns whether the column is selected afterwards.
    pub fn toggle(&mut self, catalog: &SchemaCatalog, table: &str, column: &str) -> ReportResult<bool> {
        let idx = self.position(table)?;
        catalog.column(table, column)?;
        let selection = &mut self.tables[idx];
        if let Some(pos) = selection.selected.iter().position(|c| c == column) {
            selection.selected.remove(pos);
            Ok(false)
        } else {
            selection.selected.push(column.to_string());
            Ok(true)
        }
    }

    /// Replace a table's column order.
    ///
    /// `new_order` must be a permutation of the currently selected columns.
    pub fn reorder<S: AsRef<str>>(&mut self, table: &str, new_order: &[S]) -> ReportResult<()> {
        let idx = self.position(table)?;
        let selection = &self.tables[idx];

        if new_order.len() != selection.selected.len() {
            return Err(ReportError::invalid_reorder(
                table,
                format!(
                    "expected {} columns, got {}",
                    selection.selected.len(),
                    new_order.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        for column in new_order {
            let column = column.as_ref();
            if !seen.insert(column) {
                return Err(ReportError::invalid_reorder(
                    table,
                    format!("column '{}' appears more than once", column),
                ));
            }
            if !selection.is_selected(column) {
                return Err(ReportError::invalid_reorder(
                    table,
                    format!("column '{}' is not selected", column),
                ));
            }
        }

        self.tables[idx].selected = new_order.iter().map(|c| c.as_ref().to_string()).collect();
        Ok(())
    }

    /// Replace a table's selection wholesale, validating each column.
    pub fn set_selection<S: AsRef<str>>(
        &mut self,
        catalog: &SchemaCatalog,
        table: &str,
        columns: &[S],
    ) -> ReportResult<()> {
        let idx = self.position(table)?;
        let mut selected: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            catalog.column(table, column)?;
            if selected.iter().any(|c| c == column) {
                return Err(ReportError::InvalidComposition(format!(
                    "column '{}.{}' selected more than once",
                    table, column
                )));
            }
            selected.push(column.to_string());
        }
        self.tables[idx].selected = selected;
        Ok(())
    }

    /// Number of selected columns of a table.
    pub fn selected_count(&self, table: &str) -> ReportResult<usize> {
        Ok(self.selection(table)?.selected.len())
    }

    /// Selected-of-total counter, computed from the current selection.
    pub fn column_counter(&self, catalog: &SchemaCatalog, table: &str) -> ReportResult<ColumnCounter> {
        let selected = self.selected_count(table)?;
        let total = catalog.get_table(table)?.column_count();
        Ok(ColumnCounter { selected, total })
    }

    /// Selected columns across all tables, table order then column order.
    pub fn selected_fields(&self) -> Vec<FieldRef> {
        self.tables
            .iter()
            .flat_map(|t| t.selected.iter().map(move |c| FieldRef::new(&t.name, c)))
            .collect()
    }

    pub fn total_selected(&self) -> usize {
        self.tables.iter().map(|t| t.selected.len()).sum()
    }

    /// Field used for newly added filter conditions: the first selected
    /// column, or the primary table's first column when nothing is selected.
    pub fn first_field(&self, catalog: &SchemaCatalog) -> ReportResult<FieldRef> {
        if let Some(field) = self.selected_fields().into_iter().next() {
            return Ok(field);
        }
        let primary = catalog.get_table(&self.primary)?;
        primary
            .columns
            .first()
            .map(|c| FieldRef::new(&self.primary, &c.name))
            .ok_or_else(|| {
                ReportError::InvalidComposition(format!("table '{}' has no columns", self.primary))
            })
    }
}

/// Remove a table together with every filter condition that references it.
///
/// Both sides are checked before anything changes, so a failed removal
/// leaves the composition and the filters untouched.
pub fn remove_table_cascade(
    composition: &mut ReportComposition,
    filters: &mut FilterGroup,
    table: &str,
) -> ReportResult<CascadeSummary> {
    let removed_columns = composition.remove_table(table)?;
    let removed_conditions = filters.remove_table_references(table);
    Ok(CascadeSummary {
        table: table.to_string(),
        removed_columns,
        removed_conditions,
    })
}
