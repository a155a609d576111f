// tests/executor/executor_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use async_trait::async_trait;
use quarry::composition::{JoinPlan, ReportComposition};
use quarry::error::{ReportError, ReportResult};
use quarry::executor::{
    DataSource, InMemoryDataSource, QueryExecutor, QueryRequest, SortDirection, SortSpec,
};
use quarry::filter::FilterGroup;
use quarry::schema::{FieldRef, SchemaCatalog};
use quarry::value::{Row, Value};

fn field(table: &str, column: &str) -> FieldRef {
    FieldRef::new(table, column)
}

fn employees(catalog: &SchemaCatalog) -> ReportComposition {
    ReportComposition::with_all_columns(catalog, "employees").unwrap()
}

fn id(row: &Row) -> i64 {
    match row["employees.id"] {
        Value::Integer(id) => id,
        ref other => panic!("unexpected id {:?}", other),
    }
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r["employees.first_name"].to_string())
        .collect()
}

#[tokio::test]
async fn test_pages_of_ten() {
    let executor = common::hr_executor();
    let composition = employees(executor.catalog());
    let filters = FilterGroup::default();

    let mut sizes = Vec::new();
    for page in 0..3 {
        let result = executor
            .execute(&composition, &filters, &QueryRequest::page(page))
            .await
            .unwrap();
        assert_eq!(result.total_rows, 23);
        assert_eq!(result.page.total_pages, 3);
        assert_eq!(result.page.index, page);
        sizes.push(result.rows.len());
    }
    assert_eq!(sizes, vec![10, 10, 3]);
}

#[tokio::test]
async fn test_page_beyond_end_is_clamped() {
    let executor = common::hr_executor();
    let composition = employees(executor.catalog());

    let result = executor
        .execute(&composition, &FilterGroup::default(), &QueryRequest::page(5))
        .await
        .unwrap();
    assert_eq!(result.page.index, 2);
    assert_eq!(names(&result.rows), vec!["Rosa", "Sam", "Zoe"]);
    assert!(!result.page.has_next());
    assert!(result.page.has_previous());
}

#[tokio::test]
async fn test_sort_descending_reverses_ascending() {
    let executor = common::hr_executor().with_page_size(50);
    let composition = employees(executor.catalog());
    let filters = FilterGroup::default();
    let column = field("employees", "first_name");

    let asc = executor
        .execute(
            &composition,
            &filters,
            &QueryRequest::default().with_sort(SortSpec::ascending(column.clone())),
        )
        .await
        .unwrap();
    let desc = executor
        .execute(
            &composition,
            &filters,
            &QueryRequest::default().with_sort(SortSpec::descending(column)),
        )
        .await
        .unwrap();

    let mut reversed = names(&desc.rows);
    reversed.reverse();
    assert_eq!(names(&asc.rows), reversed);
    assert_eq!(names(&asc.rows)[0], "Anna");
    assert_eq!(names(&desc.rows)[0], "Zoe");
}

#[tokio::test]
async fn test_sort_ties_stable_and_nulls_last() {
    let executor = common::hr_executor().with_page_size(50);
    let composition = employees(executor.catalog());
    let filters = FilterGroup::default();
    let column = field("employees", "department_id");

    for spec in [SortSpec::ascending(column.clone()), SortSpec::descending(column.clone())] {
        let first_department = match spec.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => 3,
        };
        let result = executor
            .execute(&composition, &filters, &QueryRequest::default().with_sort(spec))
            .await
            .unwrap();
        let ids: Vec<i64> = result.rows.iter().map(id).collect();

        // the employee without a department comes last either way
        assert_eq!(ids[22], 23);
        assert_eq!(result.rows[22]["employees.department_id"], Value::Null);

        // ties keep source order
        let leading: Vec<i64> = (0..8).map(|i| first_department + 3 * i).collect();
        let leading: Vec<i64> = leading.into_iter().filter(|id| *id < 23).collect();
        assert_eq!(ids[..leading.len()], leading[..]);
    }
}

#[tokio::test]
async fn test_join_drops_unmatched_rows() {
    let executor = common::hr_executor();
    let catalog = Arc::clone(executor.catalog());
    let mut composition = employees(&catalog);
    composition.add_table(&catalog, "departments").unwrap();
    composition.toggle(&catalog, "departments", "name").unwrap();

    let result = executor
        .execute(&composition, &FilterGroup::default(), &QueryRequest::default())
        .await
        .unwrap();
    assert_eq!(result.total_rows, 22);
    assert_eq!(result.columns.len(), 7);
    assert_eq!(result.rows[0]["departments.name"], Value::from("Engineering"));
    assert_eq!(result.rows[1]["departments.name"], Value::from("Sales"));
}

#[tokio::test]
async fn test_search_covers_selected_cells_only() {
    let executor = common::hr_executor().with_page_size(50);
    let catalog = Arc::clone(executor.catalog());
    let mut composition = employees(&catalog);
    let filters = FilterGroup::default();

    let result = executor
        .execute(&composition, &filters, &QueryRequest::default().with_search("  JO "))
        .await
        .unwrap();
    assert_eq!(names(&result.rows), vec!["John", "Johnny", "Joan", "Jonah"]);

    let result = executor
        .execute(&composition, &filters, &QueryRequest::default().with_search("EXAMPLE.COM"))
        .await
        .unwrap();
    assert_eq!(result.total_rows, 23);

    composition.toggle(&catalog, "employees", "email").unwrap();
    let result = executor
        .execute(&composition, &filters, &QueryRequest::default().with_search("example.com"))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result.page.total_pages, 0);
}

#[tokio::test]
async fn test_sort_column_need_not_be_selected() {
    let executor = common::hr_executor();
    let catalog = Arc::clone(executor.catalog());
    let mut composition = ReportComposition::new(&catalog, "employees").unwrap();
    composition.toggle(&catalog, "employees", "first_name").unwrap();

    let request = QueryRequest::default().with_sort(SortSpec::descending(field("employees", "hire_date")));
    let result = executor
        .execute(&composition, &FilterGroup::default(), &request)
        .await
        .unwrap();

    assert_eq!(names(&result.rows)[..3], ["Zoe", "Sam", "Rosa"]);
    assert!(result.rows.iter().all(|r| r.len() == 1));
}

#[tokio::test]
async fn test_nothing_selected_is_invalid() {
    let executor = common::hr_executor();
    let composition = ReportComposition::new(executor.catalog(), "employees").unwrap();

    let err = executor
        .execute(&composition, &FilterGroup::default(), &QueryRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidComposition(_)));
}

#[tokio::test]
async fn test_sort_on_foreign_table_rejected() {
    let executor = common::hr_executor();
    let composition = employees(executor.catalog());
    let request = QueryRequest::default().with_sort(SortSpec::ascending(field("departments", "name")));

    let err = executor
        .execute(&composition, &FilterGroup::default(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NotFound { .. }));
}

struct BrokenSource;

#[async_trait]
impl DataSource for BrokenSource {
    async fn fetch_rows(&self, _plan: &JoinPlan, _columns: &[FieldRef]) -> ReportResult<Vec<Row>> {
        Err(ReportError::ExecutionFailure("connection reset".into()))
    }
}

#[tokio::test]
async fn test_source_failure_is_retriable() {
    let catalog = common::hr_catalog();
    let composition = employees(&catalog);
    let executor = QueryExecutor::new(Arc::clone(&catalog), Arc::new(BrokenSource));

    let err = executor
        .execute(&composition, &FilterGroup::default(), &QueryRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err, ReportError::ExecutionFailure("connection reset".into()));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_loaded_from_json_document() {
    let catalog = common::hr_catalog();
    let source = InMemoryDataSource::from_json_str(
        Arc::clone(&catalog),
        r#"{"departments": [{"id": 1, "name": "Legal"}, {"id": 2, "name": "Ops"}]}"#,
    )
    .unwrap();
    assert_eq!(source.row_count("departments"), 2);

    let composition = ReportComposition::with_all_columns(&catalog, "departments").unwrap();
    let executor = QueryExecutor::new(catalog, Arc::new(source));
    let result = executor
        .execute(&composition, &FilterGroup::default(), &QueryRequest::default())
        .await
        .unwrap();
    assert_eq!(result.rows[1]["departments.name"], Value::from("Ops"));
}
