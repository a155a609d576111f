//! Single-column stable sorting with nulls last.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::schema::FieldRef;
use crate::value::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// The active sort: one column and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: FieldRef,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: FieldRef) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: FieldRef) -> Self {
        Self {
            column,
            direction: SortDirection::Descending,
        }
    }

    /// The sort after a user picks `column`.
    ///
    /// Picking the active column flips its direction; any other column
    /// replaces the active sort, ascending.
    pub fn toggled(current: Option<&SortSpec>, column: FieldRef) -> SortSpec {
        match current {
            Some(spec) if spec.column == column => SortSpec {
                column,
                direction: spec.direction.reversed(),
            },
            _ => SortSpec::ascending(column),
        }
    }
}

/// Stable sort of rows by the sort column. Nulls sort last in either
/// direction; values of incomparable types keep their relative order.
pub fn sort_rows(rows: &mut [Row], spec: &SortSpec) {
    let key = spec.column.key();
    rows.sort_by(|a, b| {
        let left = a.get(&key).unwrap_or(&Value::Null);
        let right = b.get(&key).unwrap_or(&Value::Null);
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = left.compare(right).unwrap_or(Ordering::Equal);
                match spec.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
        }
    });
}
