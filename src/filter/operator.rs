//! Filter operators and the per-type operator sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::SemanticType;

/// A comparison operator for a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    OnOrAfter,
    OnOrBefore,
}

const STRING_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Contains,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
];

const NUMERIC_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::LessThan,
    FilterOperator::GreaterOrEqual,
    FilterOperator::LessOrEqual,
];

const DATE_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::LessThan,
    FilterOperator::OnOrAfter,
    FilterOperator::OnOrBefore,
];

const BOOLEAN_OPERATORS: &[FilterOperator] = &[FilterOperator::Equals];

/// Operators offered for a semantic type, in presentation order.
pub fn operators_for(ty: SemanticType) -> &'static [FilterOperator] {
    match ty {
        SemanticType::String => STRING_OPERATORS,
        SemanticType::Integer | SemanticType::Decimal => NUMERIC_OPERATORS,
        SemanticType::Date => DATE_OPERATORS,
        SemanticType::Boolean => BOOLEAN_OPERATORS,
    }
}

impl FilterOperator {
    /// The operator a new condition on a field of this type starts with.
    pub fn default_for(ty: SemanticType) -> Self {
        operators_for(ty)[0]
    }

    pub fn is_valid_for(&self, ty: SemanticType) -> bool {
        operators_for(ty).contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not-equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts-with",
            FilterOperator::EndsWith => "ends-with",
            FilterOperator::GreaterThan => "greater-than",
            FilterOperator::LessThan => "less-than",
            FilterOperator::GreaterOrEqual => "greater-or-equal",
            FilterOperator::LessOrEqual => "less-or-equal",
            FilterOperator::OnOrAfter => "on-or-after",
            FilterOperator::OnOrBefore => "on-or-before",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals (=)",
            FilterOperator::NotEquals => "not equals (≠)",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::EndsWith => "ends with",
            FilterOperator::GreaterThan => "greater than (>)",
            FilterOperator::LessThan => "less than (<)",
            FilterOperator::GreaterOrEqual => "greater or equal (≥)",
            FilterOperator::LessOrEqual => "less or equal (≤)",
            FilterOperator::OnOrAfter => "on or after",
            FilterOperator::OnOrBefore => "on or before",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "equals" | "eq" => FilterOperator::Equals,
            "not-equals" | "neq" => FilterOperator::NotEquals,
            "contains" => FilterOperator::Contains,
            "starts-with" | "starts" => FilterOperator::StartsWith,
            "ends-with" | "ends" => FilterOperator::EndsWith,
            "greater-than" | "gt" => FilterOperator::GreaterThan,
            "less-than" | "lt" => FilterOperator::LessThan,
            "greater-or-equal" | "gte" => FilterOperator::GreaterOrEqual,
            "less-or-equal" | "lte" => FilterOperator::LessOrEqual,
            "on-or-after" => FilterOperator::OnOrAfter,
            "on-or-before" => FilterOperator::OnOrBefore,
            other => return Err(format!("unknown filter operator: '{}'", other)),
        };
        Ok(op)
    }
}
