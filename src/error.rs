//! Error taxonomy for report composition, filtering, execution and storage.
//!
//! Every failed operation is a no-op on the state it was asked to change, so
//! callers can surface the error and let the user retry immediately.

use std::fmt;

use crate::schema::SemanticType;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// What kind of object a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Column,
    Report,
    Condition,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Report => "report",
            ObjectKind::Condition => "filter condition",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutating action guarded by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
    Copy,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Edit => f.write_str("edit"),
            Action::Delete => f.write_str("delete"),
            Action::Copy => f.write_str("copy"),
        }
    }
}

/// Errors surfaced by the report engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReportError {
    /// Unknown table, column, report or filter condition.
    #[error("unknown {kind}: '{name}'")]
    NotFound { kind: ObjectKind, name: String },

    /// No foreign-key path links the table to the primary table.
    #[error("table '{table}' has no foreign-key path to primary table '{primary}'")]
    Unjoinable { table: String, primary: String },

    /// The primary table can never be removed from a composition.
    #[error("primary table '{0}' cannot be removed")]
    PrimaryTableProtected(String),

    /// The table is already part of the composition.
    #[error("table '{0}' is already part of the report")]
    DuplicateTable(String),

    /// A reorder request was not a permutation of the selected columns.
    #[error("invalid column order for table '{table}': {reason}")]
    InvalidReorder { table: String, reason: String },

    /// A filter value could not be coerced to the field's semantic type.
    #[error("value '{value}' is not a valid {expected} for field '{field}'")]
    InvalidFilterValue {
        field: String,
        value: String,
        expected: SemanticType,
    },

    /// The operator is not offered for the field's semantic type.
    #[error("operator '{operator}' is not available for {semantic_type} field '{field}'")]
    InvalidOperator {
        field: String,
        operator: String,
        semantic_type: SemanticType,
    },

    /// The composition cannot be saved or executed in its current shape.
    #[error("invalid report composition: {0}")]
    InvalidComposition(String),

    /// The durable local write failed; nothing was saved.
    #[error("failed to persist preferences locally: {0}")]
    LocalPersistFailure(String),

    /// The advisory remote backup failed; local state is unaffected.
    #[error("remote backup failed: {0}")]
    RemoteBackupFailure(String),

    /// The data source or row evaluation failed during execution.
    #[error("report execution failed: {0}")]
    ExecutionFailure(String),

    /// The access policy refused the action.
    #[error("access denied: cannot {action} report '{report_id}'")]
    AccessDenied { report_id: String, action: Action },
}

impl ReportError {
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_reorder(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReorder {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the same operation may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailure(_) | Self::RemoteBackupFailure(_) | Self::LocalPersistFailure(_)
        )
    }
}
