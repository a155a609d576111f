//! Typed filter values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};
use crate::schema::{FieldRef, SemanticType};
use crate::value::{parse_bool, parse_date, Value};

/// The right-hand side of a filter condition, typed per the field.
///
/// `Unset` marks a condition the user has not filled in yet; such
/// conditions are skipped during evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    #[default]
    Unset,
    String(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Boolean(bool),
}

impl FilterValue {
    /// Coerce raw user input to the field's semantic type.
    ///
    /// Empty (or whitespace-only, for non-string types) input yields `Unset`.
    pub fn parse(field: &FieldRef, raw: &str, ty: SemanticType) -> ReportResult<Self> {
        if raw.is_empty() || (ty != SemanticType::String && raw.trim().is_empty()) {
            return Ok(FilterValue::Unset);
        }

        let invalid = || ReportError::InvalidFilterValue {
            field: field.key(),
            value: raw.to_string(),
            expected: ty,
        };

        let value = match ty {
            SemanticType::String => FilterValue::String(raw.to_string()),
            SemanticType::Integer => {
                FilterValue::Integer(raw.trim().parse::<i64>().map_err(|_| invalid())?)
            }
            SemanticType::Decimal => {
                let d = raw.trim().parse::<f64>().map_err(|_| invalid())?;
                if !d.is_finite() {
                    return Err(invalid());
                }
                FilterValue::Decimal(d)
            }
            SemanticType::Date => FilterValue::Date(parse_date(raw).ok_or_else(invalid)?),
            SemanticType::Boolean => FilterValue::Boolean(parse_bool(raw).ok_or_else(invalid)?),
        };
        Ok(value)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FilterValue::Unset)
    }

    /// Whether this value is usable for a field of the given type.
    ///
    /// Integers are accepted for decimal fields.
    pub fn matches_type(&self, ty: SemanticType) -> bool {
        matches!(
            (self, ty),
            (FilterValue::Unset, _)
                | (FilterValue::String(_), SemanticType::String)
                | (FilterValue::Integer(_), SemanticType::Integer)
                | (FilterValue::Integer(_), SemanticType::Decimal)
                | (FilterValue::Decimal(_), SemanticType::Decimal)
                | (FilterValue::Date(_), SemanticType::Date)
                | (FilterValue::Boolean(_), SemanticType::Boolean)
        )
    }

    /// Raw text form, as a user would have typed it.
    pub fn raw(&self) -> String {
        self.as_cell().map(|v| v.to_string()).unwrap_or_default()
    }

    /// The value as a row cell, for comparison. `None` when unset.
    pub fn as_cell(&self) -> Option<Value> {
        match self {
            FilterValue::Unset => None,
            FilterValue::String(s) => Some(Value::String(s.clone())),
            FilterValue::Integer(i) => Some(Value::Integer(*i)),
            FilterValue::Decimal(d) => Some(Value::Decimal(*d)),
            FilterValue::Date(d) => Some(Value::Date(*d)),
            FilterValue::Boolean(b) => Some(Value::Boolean(*b)),
        }
    }
}
