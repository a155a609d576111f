//! # Quarry
//!
//! A report query builder and execution engine.
//!
//! ## Architecture
//!
//! Users pick a primary table, add related tables linked by foreign keys,
//! select and reorder columns, attach typed filter conditions and run the
//! report with sorting and pagination:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SchemaCatalog                           │
//! │     (tables, typed columns, declared foreign keys)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [join resolver]
//! ┌─────────────────────────────────────────────────────────┐
//! │        ReportComposition + JoinPlan                      │
//! │        (table set, per-table column selection)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter engine]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 FilterGroup (AND/OR tree)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │      PagedResult (filter → search → sort → page)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`session::ReportSession`] owns one report's state and execution
//! lifecycle. Its composition, filters and sort are saved through the
//! two-tier [`preferences::PreferenceStore`]: a local SQLite store that is
//! authoritative, and an advisory remote backup that may fail on its own.

pub mod auth;
pub mod composition;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod filter;
pub mod preferences;
pub mod registry;
pub mod schema;
pub mod session;
pub mod value;

pub use error::{ReportError, ReportResult};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::auth::{AccessPolicy, Role, StaticAccess};
    pub use crate::composition::{JoinPlan, ReportComposition};
    pub use crate::error::{Action, ObjectKind, ReportError, ReportResult};
    pub use crate::executor::{
        DataSource, InMemoryDataSource, PagedResult, QueryExecutor, QueryRequest, SortDirection,
        SortSpec,
    };
    pub use crate::filter::{
        Combinator, FilterCondition, FilterGroup, FilterId, FilterOperator, FilterValue,
    };
    pub use crate::preferences::{
        BackupStatus, PreferenceRecord, PreferenceStore, RemoteBackup, SqlitePreferenceStore,
    };
    pub use crate::registry::{InMemoryRegistry, ReportMetadata, ReportRegistry};
    pub use crate::schema::{Column, FieldRef, ForeignKey, SchemaCatalog, SemanticType, Table};
    pub use crate::session::{ExecutionState, ReportSession};
    pub use crate::value::{Row, Value};
}
