//! Report registry - report metadata, view tracking, copy and delete.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::{require, AccessPolicy};
use crate::error::{Action, ObjectKind, ReportError, ReportResult};
use crate::preferences::PreferenceStore;

/// Catalog entry for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub primary_table: String,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// Duration of the last successful execution, in milliseconds.
    #[serde(default, rename = "lastExecutionDuration")]
    pub last_execution_ms: Option<u64>,
}

impl ReportMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>, primary_table: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: String::new(),
            primary_table: primary_table.into(),
            last_viewed_at: None,
            last_execution_ms: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Storage of report metadata.
pub trait ReportRegistry: Send + Sync {
    /// All reports, ordered by category then title.
    fn list_reports(&self) -> Vec<ReportMetadata>;
    fn get(&self, report_id: &str) -> ReportResult<ReportMetadata>;
    /// Insert or replace a report's metadata.
    fn register(&self, metadata: ReportMetadata);
    /// Record a successful execution.
    fn record_view(&self, report_id: &str, at: DateTime<Utc>, duration: Duration) -> ReportResult<()>;
    fn remove(&self, report_id: &str) -> ReportResult<ReportMetadata>;
}

/// Registry held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    reports: DashMap<String, ReportMetadata>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: impl IntoIterator<Item = ReportMetadata>) -> Self {
        let registry = Self::new();
        for report in reports {
            registry.register(report);
        }
        registry
    }
}

impl ReportRegistry for InMemoryRegistry {
    fn list_reports(&self) -> Vec<ReportMetadata> {
        let mut reports: Vec<ReportMetadata> =
            self.reports.iter().map(|r| r.value().clone()).collect();
        reports.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        reports
    }

    fn get(&self, report_id: &str) -> ReportResult<ReportMetadata> {
        self.reports
            .get(report_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| ReportError::not_found(ObjectKind::Report, report_id))
    }

    fn register(&self, metadata: ReportMetadata) {
        self.reports.insert(metadata.id.clone(), metadata);
    }

    fn record_view(&self, report_id: &str, at: DateTime<Utc>, duration: Duration) -> ReportResult<()> {
        let mut entry = self
            .reports
            .get_mut(report_id)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Report, report_id))?;
        entry.last_viewed_at = Some(at);
        entry.last_execution_ms = Some(duration.as_millis() as u64);
        Ok(())
    }

    fn remove(&self, report_id: &str) -> ReportResult<ReportMetadata> {
        self.reports
            .remove(report_id)
            .map(|(_, metadata)| metadata)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Report, report_id))
    }
}

/// Access-checked report lifecycle operations.
pub struct ReportManager {
    registry: Arc<dyn ReportRegistry>,
    store: Arc<PreferenceStore>,
    access: Arc<dyn AccessPolicy>,
}

impl ReportManager {
    pub fn new(
        registry: Arc<dyn ReportRegistry>,
        store: Arc<PreferenceStore>,
        access: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            registry,
            store,
            access,
        }
    }

    pub fn registry(&self) -> &Arc<dyn ReportRegistry> {
        &self.registry
    }

    /// Duplicate a report's metadata and saved preferences under a new id.
    pub fn copy_as_new(&self, report_id: &str, title: &str) -> ReportResult<ReportMetadata> {
        require(self.access.as_ref(), report_id, Action::Copy)?;
        let source = self.registry.get(report_id)?;

        let copy = ReportMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            last_viewed_at: None,
            last_execution_ms: None,
            ..source
        };
        self.store.copy(report_id, &copy.id)?;
        self.registry.register(copy.clone());
        tracing::info!(from = report_id, to = %copy.id, "report copied");
        Ok(copy)
    }

    /// Delete a report's metadata and saved preferences.
    pub fn delete(&self, report_id: &str) -> ReportResult<ReportMetadata> {
        require(self.access.as_ref(), report_id, Action::Delete)?;
        self.registry.get(report_id)?;
        self.store.clear(report_id)?;
        let removed = self.registry.remove(report_id)?;
        tracing::info!(report_id, "report deleted");
        Ok(removed)
    }
}
