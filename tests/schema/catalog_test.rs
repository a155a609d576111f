// tests/schema/catalog_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::io::Write;

use quarry::error::{ObjectKind, ReportError};
use quarry::schema::{CatalogError, FieldRef, SchemaCatalog, SemanticType};

#[test]
fn test_get_table_and_list_tables() {
    let catalog = common::hr_catalog();

    assert_eq!(catalog.list_tables(), vec!["employees", "departments"]);
    let employees = catalog.get_table("employees").unwrap();
    assert_eq!(employees.column_count(), 6);
    assert_eq!(employees.foreign_keys.len(), 1);
    assert_eq!(catalog.get_table("departments").unwrap().column_count(), 2);
}

#[test]
fn test_unknown_table_is_not_found() {
    let catalog = common::hr_catalog();
    let err = catalog.get_table("payroll").unwrap_err();
    assert_eq!(err, ReportError::not_found(ObjectKind::Table, "payroll"));
}

#[test]
fn test_resolve_field() {
    let catalog = common::hr_catalog();
    let hire = catalog
        .resolve(&FieldRef::new("employees", "hire_date"))
        .unwrap();
    assert_eq!(hire.semantic_type, SemanticType::Date);
    assert_eq!(hire.format.as_deref(), Some("YYYY-MM-DD"));

    let err = catalog
        .resolve(&FieldRef::new("employees", "salary"))
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::NotFound {
            kind: ObjectKind::Column,
            ..
        }
    ));
}

#[test]
fn test_display_labels() {
    let catalog = common::hr_catalog();
    let first = catalog.column("employees", "first_name").unwrap();
    assert_eq!(first.display_label(), "First Name");
    let email = catalog.column("employees", "email").unwrap();
    assert_eq!(email.display_label(), "E-mail");
}

#[test]
fn test_load_from_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{
  "tables": [
    {{"name": "orders", "columns": [
      {{"name": "id", "type": "integer"}},
      {{"name": "total", "type": "decimal", "calculation": "sum"}},
      {{"name": "paid", "type": "boolean"}}
    ]}}
  ]
}}"#
    )
    .unwrap();

    let catalog = SchemaCatalog::from_file(file.path()).unwrap();
    let total = catalog.column("orders", "total").unwrap();
    assert_eq!(total.semantic_type, SemanticType::Decimal);
    assert_eq!(total.calculation.as_deref(), Some("sum"));
}

#[test]
fn test_missing_file() {
    let result = SchemaCatalog::from_file("/nonexistent/catalog.toml");
    assert!(matches!(result, Err(CatalogError::FileNotFound(_))));
}

#[test]
fn test_invalid_definition_rejected() {
    let toml = r#"
[[tables]]
name = "employees"
columns = [
  { name = "id", type = "integer" },
  { name = "id", type = "string" },
]
"#;
    assert!(matches!(
        SchemaCatalog::from_toml_str(toml),
        Err(CatalogError::Invalid(_))
    ));
}
