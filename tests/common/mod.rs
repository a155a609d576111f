// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use quarry::executor::{InMemoryDataSource, QueryExecutor};
use quarry::schema::{Column, ForeignKey, SchemaCatalog, SemanticType, Table};

pub const FIRST_NAMES: [&str; 23] = [
    "John", "Jane", "Johnny", "Priya", "Asha", "Rahul", "Joan", "Mark", "Sara", "Ravi", "Meera",
    "Tom", "Anna", "Jonah", "Lena", "Omar", "Kate", "Ivan", "Nina", "Paul", "Rosa", "Sam", "Zoe",
];

/// `employees` (6 columns) linked to `departments` (2 columns) by
/// `employees.department_id -> departments.id`.
pub fn hr_catalog() -> Arc<SchemaCatalog> {
    let catalog = SchemaCatalog::new(vec![
        Table::new("employees")
            .with_column(Column::new("id", SemanticType::Integer))
            .with_column(Column::new("first_name", SemanticType::String))
            .with_column(Column::new("last_name", SemanticType::String))
            .with_column(Column::new("email", SemanticType::String).with_label("E-mail"))
            .with_column(Column::new("hire_date", SemanticType::Date).with_format("YYYY-MM-DD"))
            .with_column(Column::new("department_id", SemanticType::Integer).nullable())
            .with_foreign_key(ForeignKey::new("department_id", "departments", "id")),
        Table::new("departments")
            .with_column(Column::new("id", SemanticType::Integer))
            .with_column(Column::new("name", SemanticType::String)),
    ])
    .expect("valid catalog");
    Arc::new(catalog)
}

/// 23 employees; the last one has no department.
pub fn hr_source(catalog: &Arc<SchemaCatalog>) -> InMemoryDataSource {
    let employees: Vec<serde_json::Value> = FIRST_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let id = i as i64 + 1;
            let department = if id == 23 {
                serde_json::Value::Null
            } else {
                serde_json::json!((id - 1) % 3 + 1)
            };
            serde_json::json!({
                "id": id,
                "first_name": name,
                "last_name": format!("Surname{:02}", id),
                "email": format!("{}@example.com", name.to_lowercase()),
                "hire_date": format!("2021-03-{:02}", id),
                "department_id": department,
            })
        })
        .collect();
    let departments = vec![
        serde_json::json!({"id": 1, "name": "Engineering"}),
        serde_json::json!({"id": 2, "name": "Sales"}),
        serde_json::json!({"id": 3, "name": "Finance"}),
    ];

    let mut source = InMemoryDataSource::new(Arc::clone(catalog));
    source.insert_json("employees", &employees).expect("employees load");
    source.insert_json("departments", &departments).expect("departments load");
    source
}

pub fn hr_executor() -> QueryExecutor<InMemoryDataSource> {
    let catalog = hr_catalog();
    let source = hr_source(&catalog);
    QueryExecutor::new(catalog, Arc::new(source))
}
