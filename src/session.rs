//! Report session - the single owner of one report's view state.
//!
//! A session serializes every edit to its composition, filters, sort,
//! search and page through `&mut self`, and tracks execution with an
//! explicit state machine:
//!
//! ```text
//!            start_execution            complete(Ok)
//!   Idle ─────────────────► Executing ─────────────► Ready
//!    ▲                        │  ▲                     │
//!    │ retry                  │  └─────────────────────┘
//!    │        complete(Err)   ▼      start_execution
//!    └───────────────────── Failed
//! ```
//!
//! Every execution gets a generation number. Completing an execution
//! whose generation is no longer the latest is a no-op, so a slow earlier
//! request can never overwrite the result of a newer one.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{require, AccessPolicy};
use crate::composition::{remove_table_cascade, CascadeSummary, ColumnCounter, ReportComposition};
use crate::error::{Action, ObjectKind, ReportError, ReportResult};
use crate::executor::{DataSource, PagedResult, QueryExecutor, QueryRequest, SortSpec};
use crate::filter::{Combinator, FilterGroup, FilterId, FilterOperator};
use crate::preferences::{LoadSource, PreferenceRecord, PreferenceStore, SaveReceipt};
use crate::registry::ReportRegistry;
use crate::schema::{FieldRef, SchemaCatalog};

/// Execution status of a report view.
#[derive(Debug, Clone)]
pub enum ExecutionState {
    Idle,
    Executing { generation: u64 },
    Ready(Arc<PagedResult>),
    Failed(ReportError),
}

impl ExecutionState {
    pub fn is_executing(&self) -> bool {
        matches!(self, ExecutionState::Executing { .. })
    }

    pub fn result(&self) -> Option<&Arc<PagedResult>> {
        match self {
            ExecutionState::Ready(result) => Some(result),
            _ => None,
        }
    }
}

/// A detached execution carrying a snapshot of the session parameters.
pub struct ExecutionTicket<S: DataSource> {
    generation: u64,
    executor: QueryExecutor<S>,
    composition: ReportComposition,
    filters: FilterGroup,
    request: QueryRequest,
}

impl<S: DataSource> ExecutionTicket<S> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> ExecutionOutcome {
        let result = self
            .executor
            .execute(&self.composition, &self.filters, &self.request)
            .await;
        ExecutionOutcome {
            generation: self.generation,
            result,
        }
    }
}

/// Result of a ticket, to be handed back to [`ReportSession::complete`].
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub generation: u64,
    pub result: ReportResult<PagedResult>,
}

pub struct ReportSession<S: DataSource> {
    report_id: String,
    executor: QueryExecutor<S>,
    access: Arc<dyn AccessPolicy>,
    registry: Option<Arc<dyn ReportRegistry>>,
    composition: ReportComposition,
    filters: FilterGroup,
    sort: Option<SortSpec>,
    search: Option<String>,
    page: usize,
    state: ExecutionState,
    generation: u64,
    /// Fingerprint of the record last loaded or saved.
    baseline: Option<String>,
}

impl<S: DataSource> ReportSession<S> {
    pub fn new(
        report_id: impl Into<String>,
        executor: QueryExecutor<S>,
        composition: ReportComposition,
        access: Arc<dyn AccessPolicy>,
    ) -> Self {
        let mut session = Self {
            report_id: report_id.into(),
            executor,
            access,
            registry: None,
            composition,
            filters: FilterGroup::default(),
            sort: None,
            search: None,
            page: 0,
            state: ExecutionState::Idle,
            generation: 0,
            baseline: None,
        };
        session.baseline = session.to_record().fingerprint().ok();
        session
    }

    /// Open a report from its saved preferences.
    ///
    /// Without saved preferences, or when the saved ones no longer fit the
    /// catalog, the session starts from the primary table with every
    /// column selected.
    pub async fn open(
        report_id: &str,
        primary_table: &str,
        executor: QueryExecutor<S>,
        store: &PreferenceStore,
        access: Arc<dyn AccessPolicy>,
    ) -> ReportResult<Self> {
        let catalog = Arc::clone(executor.catalog());
        let loaded = store.load(report_id, primary_table).await;

        let restored = match loaded.source {
            LoadSource::Default => None,
            _ => match loaded.record.restore(&catalog) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(report_id, error = %e, "saved preferences no longer fit the catalog, using defaults");
                    None
                }
            },
        };

        let mut session = match restored {
            Some((composition, filters, sort)) => {
                let mut session = Self::new(report_id, executor, composition, access);
                session.filters = filters;
                session.sort = sort;
                session
            }
            None => {
                let composition = ReportComposition::with_all_columns(&catalog, primary_table)?;
                Self::new(report_id, executor, composition, access)
            }
        };
        session.baseline = session.to_record().fingerprint().ok();
        Ok(session)
    }

    pub fn with_registry(mut self, registry: Arc<dyn ReportRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.executor.catalog()
    }

    pub fn composition(&self) -> &ReportComposition {
        &self.composition
    }

    pub fn filters(&self) -> &FilterGroup {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    fn require_edit(&self) -> ReportResult<()> {
        require(self.access.as_ref(), &self.report_id, Action::Edit)
    }

    /// A view parameter changed: back to the first page, and the current
    /// result no longer applies.
    fn parameters_changed(&mut self) {
        self.page = 0;
        self.invalidate();
    }

    /// Drop the shown result and supersede any execution in flight.
    fn invalidate(&mut self) {
        if self.state.is_executing() {
            self.generation += 1;
        }
        self.state = ExecutionState::Idle;
    }

    // =========================================================================
    // Composition edits (require edit access)
    // =========================================================================

    pub fn add_table(&mut self, table: &str) -> ReportResult<()> {
        self.require_edit()?;
        self.composition.add_table(self.executor.catalog(), table)?;
        self.parameters_changed();
        Ok(())
    }

    /// Remove a table with its selected columns, the conditions that
    /// reference it and a sort on one of its columns.
    pub fn remove_table(&mut self, table: &str) -> ReportResult<CascadeSummary> {
        self.require_edit()?;
        let summary = remove_table_cascade(&mut self.composition, &mut self.filters, table)?;
        if self.sort.as_ref().is_some_and(|s| s.column.table == table) {
            self.sort = None;
        }
        self.parameters_changed();
        tracing::debug!(
            report_id = %self.report_id,
            table,
            columns = summary.removed_columns,
            conditions = summary.removed_conditions,
            "table removal cascaded"
        );
        Ok(summary)
    }

    pub fn select_all(&mut self, table: &str) -> ReportResult<()> {
        self.require_edit()?;
        self.composition.select_all(self.executor.catalog(), table)?;
        self.parameters_changed();
        Ok(())
    }

    pub fn deselect_all(&mut self, table: &str) -> ReportResult<()> {
        self.require_edit()?;
        self.composition.deselect_all(table)?;
        self.parameters_changed();
        Ok(())
    }

    /// Toggle a column; returns whether it is now selected.
    pub fn toggle_column(&mut self, table: &str, column: &str) -> ReportResult<bool> {
        self.require_edit()?;
        let selected = self.composition.toggle(self.executor.catalog(), table, column)?;
        self.parameters_changed();
        Ok(selected)
    }

    pub fn reorder_columns<C: AsRef<str>>(&mut self, table: &str, order: &[C]) -> ReportResult<()> {
        self.require_edit()?;
        self.composition.reorder(table, order)?;
        self.invalidate();
        Ok(())
    }

    pub fn column_counter(&self, table: &str) -> ReportResult<ColumnCounter> {
        self.composition.column_counter(self.executor.catalog(), table)
    }

    // =========================================================================
    // Filters, sort, search and paging (session-only until saved)
    // =========================================================================

    /// Add a default condition to a group (the root when `group` is `None`).
    pub fn add_condition(&mut self, group: Option<FilterId>) -> ReportResult<FilterId> {
        let group = group.unwrap_or(self.filters.id);
        let id = self
            .filters
            .add_condition(group, &self.composition, self.executor.catalog())?;
        self.parameters_changed();
        Ok(id)
    }

    pub fn add_group(&mut self, parent: Option<FilterId>, combinator: Combinator) -> ReportResult<FilterId> {
        let parent = parent.unwrap_or(self.filters.id);
        let id = self.filters.add_group(parent, combinator)?;
        self.parameters_changed();
        Ok(id)
    }

    pub fn set_combinator(&mut self, group: FilterId, combinator: Combinator) -> ReportResult<()> {
        self.filters.set_combinator(group, combinator)?;
        self.parameters_changed();
        Ok(())
    }

    pub fn set_condition_field(&mut self, id: FilterId, field: FieldRef) -> ReportResult<()> {
        self.filters
            .set_field(id, field, &self.composition, self.executor.catalog())?;
        self.parameters_changed();
        Ok(())
    }

    pub fn set_condition_operator(&mut self, id: FilterId, operator: FilterOperator) -> ReportResult<()> {
        self.filters.set_operator(id, operator, self.executor.catalog())?;
        self.parameters_changed();
        Ok(())
    }

    pub fn set_condition_value(&mut self, id: FilterId, raw: &str) -> ReportResult<()> {
        self.filters.set_value(id, raw, self.executor.catalog())?;
        self.parameters_changed();
        Ok(())
    }

    pub fn remove_condition(&mut self, id: FilterId) -> ReportResult<()> {
        self.filters.remove(id)?;
        self.parameters_changed();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.parameters_changed();
    }

    /// Replace the whole filter tree after validating it.
    pub fn apply_filters(&mut self, filters: FilterGroup) -> ReportResult<()> {
        filters.validate(&self.composition, self.executor.catalog())?;
        self.filters = filters;
        self.parameters_changed();
        Ok(())
    }

    fn check_sort_column(&self, column: &FieldRef) -> ReportResult<()> {
        if !self.composition.contains_table(&column.table) {
            return Err(ReportError::not_found(ObjectKind::Table, &column.table));
        }
        self.executor.catalog().resolve(column)?;
        Ok(())
    }

    /// Sort by `column`, flipping the direction if it is already the sort.
    pub fn toggle_sort(&mut self, column: FieldRef) -> ReportResult<&SortSpec> {
        self.check_sort_column(&column)?;
        let next = SortSpec::toggled(self.sort.as_ref(), column);
        self.parameters_changed();
        Ok(&*self.sort.insert(next))
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> ReportResult<()> {
        if let Some(spec) = &sort {
            self.check_sort_column(&spec.column)?;
        }
        self.sort = sort;
        self.parameters_changed();
        Ok(())
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search.filter(|s| !s.trim().is_empty());
        self.parameters_changed();
    }

    /// Move to a page; sort, filters and search are kept.
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        self.invalidate();
    }

    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            page: self.page,
            sort: self.sort.clone(),
            search: self.search.clone(),
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Snapshot the parameters into a ticket and enter `Executing`.
    ///
    /// Any execution still in flight is superseded.
    pub fn start_execution(&mut self) -> ExecutionTicket<S> {
        if let ExecutionState::Executing { generation } = self.state {
            tracing::debug!(report_id = %self.report_id, generation, "superseding in-flight execution");
        }
        self.generation += 1;
        self.state = ExecutionState::Executing {
            generation: self.generation,
        };
        ExecutionTicket {
            generation: self.generation,
            executor: self.executor.clone(),
            composition: self.composition.clone(),
            filters: self.filters.clone(),
            request: self.request(),
        }
    }

    /// Apply a finished execution. Returns false when the outcome is stale.
    pub fn complete(&mut self, outcome: ExecutionOutcome) -> bool {
        if outcome.generation != self.generation {
            tracing::debug!(
                report_id = %self.report_id,
                stale = outcome.generation,
                current = self.generation,
                "discarding stale execution result"
            );
            return false;
        }

        match outcome.result {
            Ok(result) => {
                self.page = result.page.index;
                if let Some(registry) = &self.registry {
                    if let Err(e) = registry.record_view(&self.report_id, Utc::now(), result.elapsed) {
                        tracing::debug!(report_id = %self.report_id, error = %e, "view not recorded");
                    }
                }
                tracing::info!(
                    report_id = %self.report_id,
                    rows = result.total_rows,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "report ready"
                );
                self.state = ExecutionState::Ready(Arc::new(result));
            }
            Err(e) => {
                tracing::warn!(report_id = %self.report_id, error = %e, "report execution failed");
                self.state = ExecutionState::Failed(e);
            }
        }
        true
    }

    /// Execute with the current parameters and wait for the result.
    pub async fn execute(&mut self) -> ReportResult<Arc<PagedResult>> {
        let outcome = self.start_execution().run().await;
        self.complete(outcome);
        match &self.state {
            ExecutionState::Ready(result) => Ok(Arc::clone(result)),
            ExecutionState::Failed(e) => Err(e.clone()),
            _ => Err(ReportError::ExecutionFailure(
                "execution did not complete".to_string(),
            )),
        }
    }

    /// Leave `Failed` for `Idle` and execute again.
    pub async fn retry(&mut self) -> ReportResult<Arc<PagedResult>> {
        if matches!(self.state, ExecutionState::Failed(_)) {
            self.state = ExecutionState::Idle;
        }
        self.execute().await
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_record(&self) -> PreferenceRecord {
        PreferenceRecord::from_state(&self.report_id, &self.composition, &self.filters, self.sort.as_ref())
    }

    /// Save the current composition, filters and sort.
    pub fn save(&mut self, store: &PreferenceStore) -> ReportResult<SaveReceipt> {
        self.require_edit()?;
        let receipt = store.save(&self.to_record())?;
        self.baseline = Some(receipt.fingerprint.clone());
        Ok(receipt)
    }

    /// Whether the state differs from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        match (self.to_record().fingerprint(), &self.baseline) {
            (Ok(current), Some(baseline)) => &current != baseline,
            _ => true,
        }
    }
}
