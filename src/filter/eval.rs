//! Evaluation of filter trees against rows.

use std::cmp::Ordering;

use super::group::{Combinator, FilterCondition, FilterGroup, FilterNode};
use super::operator::FilterOperator;
use crate::value::{Row, Value};

/// A compiled row predicate.
pub type Predicate = Box<dyn Fn(&Row) -> bool + Send + Sync>;

impl FilterCondition {
    /// Test a row. Returns `None` while the condition has no value.
    ///
    /// A missing cell is treated as null. Nulls only satisfy `not-equals`.
    pub fn evaluate(&self, row: &Row) -> Option<bool> {
        let expected = self.value.as_cell()?;
        let cell = row.get(&self.field.key()).unwrap_or(&Value::Null);
        Some(test(self.operator, cell, &expected))
    }
}

fn test(operator: FilterOperator, cell: &Value, expected: &Value) -> bool {
    let ordering = cell.compare(expected);
    match operator {
        FilterOperator::Equals => ordering == Some(Ordering::Equal),
        FilterOperator::NotEquals => ordering != Some(Ordering::Equal),
        FilterOperator::Contains => text_test(cell, expected, |c, e| c.contains(e)),
        FilterOperator::StartsWith => text_test(cell, expected, |c, e| c.starts_with(e)),
        FilterOperator::EndsWith => text_test(cell, expected, |c, e| c.ends_with(e)),
        FilterOperator::GreaterThan => ordering == Some(Ordering::Greater),
        FilterOperator::LessThan => ordering == Some(Ordering::Less),
        FilterOperator::GreaterOrEqual | FilterOperator::OnOrAfter => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::LessOrEqual | FilterOperator::OnOrBefore => {
            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
        }
    }
}

fn text_test(cell: &Value, expected: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    match (cell, expected) {
        (Value::String(c), Value::String(e)) => f(c, e),
        _ => false,
    }
}

impl FilterGroup {
    /// Whether any condition in this subtree has a value.
    pub fn is_active(&self) -> bool {
        self.children.iter().any(|child| match child {
            FilterNode::Condition(c) => c.is_active(),
            FilterNode::Group(g) => g.is_active(),
        })
    }

    /// Evaluate the group against a row.
    ///
    /// Unset conditions are skipped; nested groups always recurse, so an
    /// empty nested OR group is false. Over the remaining children an AND
    /// group is true iff all are true (true when none remain) and an OR
    /// group is true iff any is true (false when none remain).
    pub fn evaluate(&self, row: &Row) -> bool {
        let mut results = self.children.iter().filter_map(|child| match child {
            FilterNode::Condition(c) => c.evaluate(row),
            FilterNode::Group(g) => Some(g.evaluate(row)),
        });
        match self.combinator {
            Combinator::And => results.all(|r| r),
            Combinator::Or => results.any(|r| r),
        }
    }

    /// Whether a row passes this group used as a report's root filter.
    ///
    /// A root without active conditions filters nothing, whatever its
    /// combinator.
    pub fn matches(&self, row: &Row) -> bool {
        !self.is_active() || self.evaluate(row)
    }

    /// Compile the group into a standalone root-filter predicate.
    pub fn compile(&self) -> Predicate {
        if !self.is_active() {
            return Box::new(|_| true);
        }
        let group = self.clone();
        Box::new(move |row| group.evaluate(row))
    }
}
