//! Query executor - turns a composition plus filters into one page of rows.
//!
//! ```text
//! composition ──► join plan ──► DataSource::fetch_rows
//!                                     │
//!             filter ◄────────────────┘
//!               │
//!               ▼
//!       search ──► sort ──► paginate ──► project
//! ```
//!
//! Every stage after the fetch is pure, so two executions with the same
//! inputs against the same data return the same page.

mod page;
mod sort;
mod source;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

pub use page::{paginate, PageState, DEFAULT_PAGE_SIZE};
pub use sort::{sort_rows, SortDirection, SortSpec};
pub use source::{DataSource, InMemoryDataSource};

use crate::composition::ReportComposition;
use crate::error::{ObjectKind, ReportError, ReportResult};
use crate::filter::FilterGroup;
use crate::schema::{FieldRef, SchemaCatalog};
use crate::value::Row;

/// Presentation parameters of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Requested 0-based page; clamped to the last page.
    pub page: usize,
    pub sort: Option<SortSpec>,
    /// Case-insensitive text matched against every selected cell.
    pub search: Option<String>,
}

impl QueryRequest {
    pub fn page(page: usize) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// One page of a report result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult {
    /// Qualified keys of the selected columns, in display order.
    pub columns: Vec<FieldRef>,
    /// Rows of this page, holding exactly the selected columns.
    pub rows: Vec<Row>,
    /// Row count after filtering and search, before paging.
    pub total_rows: usize,
    pub page: PageState,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PagedResult {
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

/// Executes report compositions against a data source.
pub struct QueryExecutor<S: DataSource> {
    catalog: Arc<SchemaCatalog>,
    source: Arc<S>,
    page_size: usize,
}

impl<S: DataSource> Clone for QueryExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            source: Arc::clone(&self.source),
            page_size: self.page_size,
        }
    }
}

impl<S: DataSource> QueryExecutor<S> {
    pub fn new(catalog: Arc<SchemaCatalog>, source: Arc<S>) -> Self {
        Self {
            catalog,
            source,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Execute a composition and return the requested page.
    ///
    /// Fails with `InvalidComposition` when no column is selected, with
    /// `Unjoinable` when a table lost its path to the primary, and with
    /// the filter errors for conditions that no longer fit the catalog.
    /// Data source failures surface as `ExecutionFailure`.
    pub async fn execute(
        &self,
        composition: &ReportComposition,
        filters: &FilterGroup,
        request: &QueryRequest,
    ) -> ReportResult<PagedResult> {
        let started = Instant::now();
        let columns = composition.selected_fields();
        if columns.is_empty() {
            return Err(ReportError::InvalidComposition(
                "no columns selected".to_string(),
            ));
        }

        let plan = composition.join_plan(&self.catalog)?;
        filters.validate(composition, &self.catalog)?;
        if let Some(sort) = &request.sort {
            self.validate_sort(composition, sort)?;
        }

        let fetch = fetch_columns(&columns, filters, request.sort.as_ref());
        let mut rows = self
            .source
            .fetch_rows(&plan, &fetch)
            .await
            .map_err(|e| match e {
                ReportError::ExecutionFailure(_) => e,
                other => ReportError::ExecutionFailure(other.to_string()),
            })?;
        let fetched = rows.len();

        let predicate = filters.compile();
        rows.retain(|row| predicate(row));

        if let Some(term) = request.search_term() {
            let keys: Vec<String> = columns.iter().map(FieldRef::key).collect();
            rows.retain(|row| {
                keys.iter().any(|k| {
                    row.get(k)
                        .map(|v| v.to_string().to_lowercase().contains(&term))
                        .unwrap_or(false)
                })
            });
        }

        if let Some(sort) = &request.sort {
            sort_rows(&mut rows, sort);
        }

        let total_rows = rows.len();
        let (page_rows, page) = paginate(rows, request.page, self.page_size);
        let keys: Vec<String> = columns.iter().map(FieldRef::key).collect();
        let rows = page_rows
            .into_iter()
            .map(|mut row| {
                keys.iter()
                    .map(|k| (k.clone(), row.remove(k).unwrap_or_default()))
                    .collect()
            })
            .collect();

        let elapsed = started.elapsed();
        tracing::debug!(
            primary = composition.primary(),
            fetched,
            total_rows,
            page = page.index,
            elapsed_ms = elapsed.as_millis() as u64,
            "report executed"
        );

        Ok(PagedResult {
            columns,
            rows,
            total_rows,
            page,
            elapsed,
        })
    }

    fn validate_sort(&self, composition: &ReportComposition, sort: &SortSpec) -> ReportResult<()> {
        if !composition.contains_table(&sort.column.table) {
            return Err(ReportError::not_found(ObjectKind::Table, &sort.column.table));
        }
        self.catalog.resolve(&sort.column)?;
        Ok(())
    }
}

/// Selected columns plus any column the filters or the sort read.
fn fetch_columns(selected: &[FieldRef], filters: &FilterGroup, sort: Option<&SortSpec>) -> Vec<FieldRef> {
    let mut fetch = selected.to_vec();
    let extra = filters
        .referenced_fields()
        .into_iter()
        .chain(sort.map(|s| s.column.clone()));
    for field in extra {
        if !fetch.contains(&field) {
            fetch.push(field);
        }
    }
    fetch
}
