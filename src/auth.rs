//! Access policy port.
//!
//! Role enforcement lives outside the engine; the engine only asks whether
//! an action is allowed and refuses with `AccessDenied` before touching any
//! state.

use serde::{Deserialize, Serialize};

use crate::error::{Action, ReportError, ReportResult};

/// Capability checks consumed by mutating operations.
pub trait AccessPolicy: Send + Sync {
    fn can_edit(&self, report_id: &str) -> bool;
    fn can_delete(&self, report_id: &str) -> bool;
}

/// Fixed capabilities, the same for every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAccess {
    pub edit: bool,
    pub delete: bool,
}

impl StaticAccess {
    pub fn full() -> Self {
        Self {
            edit: true,
            delete: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            edit: false,
            delete: false,
        }
    }
}

impl AccessPolicy for StaticAccess {
    fn can_edit(&self, _report_id: &str) -> bool {
        self.edit
    }

    fn can_delete(&self, _report_id: &str) -> bool {
        self.delete
    }
}

/// Coarse user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl AccessPolicy for Role {
    fn can_edit(&self, _report_id: &str) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }

    fn can_delete(&self, _report_id: &str) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Fail with `AccessDenied` unless the policy allows `action` on the report.
///
/// Copying is an edit capability.
pub fn require(policy: &dyn AccessPolicy, report_id: &str, action: Action) -> ReportResult<()> {
    let allowed = match action {
        Action::Edit | Action::Copy => policy.can_edit(report_id),
        Action::Delete => policy.can_delete(report_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ReportError::AccessDenied {
            report_id: report_id.to_string(),
            action,
        })
    }
}
