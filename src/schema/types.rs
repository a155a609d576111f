//! Table, column and foreign-key definitions for the schema catalog.

use std::fmt;
use std::str::FromStr;

use inflector::Inflector;
use serde::{Deserialize, Serialize};

use crate::error::{ObjectKind, ReportError};

/// Semantic type of a column. Determines which filter operators apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    #[serde(alias = "number")]
    Decimal,
    Date,
    Boolean,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Decimal => "decimal",
            SemanticType::Date => "date",
            SemanticType::Boolean => "boolean",
        }
    }

    /// Is this a numeric type (integer or decimal)?
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Decimal)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub nullable: bool,
    /// Explicit display label. Derived from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Display format hint, e.g. `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Calculation note shown alongside the schema, e.g. `sum`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            nullable: false,
            label: None,
            format: None,
            calculation: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_calculation(mut self, calculation: impl Into<String>) -> Self {
        self.calculation = Some(calculation.into());
        self
    }

    /// Label shown to users: the explicit label, or the title-cased name.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.name.to_title_case(),
        }
    }
}

/// A declared foreign key: `column` references `references_table.references_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }
}

/// A catalog table. Immutable once loaded into a [`SchemaCatalog`](super::SchemaCatalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// A qualified column reference: `table.column`.
///
/// Serialized as the dotted string so persisted records stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldRef {
    pub table: String,
    pub column: String,
}

impl FieldRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// The dotted key used for row cells and result headers.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl FromStr for FieldRef {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(FieldRef::new(table, column))
            }
            _ => Err(ReportError::not_found(ObjectKind::Column, s)),
        }
    }
}

impl TryFrom<String> for FieldRef {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldRef> for String {
    fn from(field: FieldRef) -> Self {
        field.key()
    }
}
