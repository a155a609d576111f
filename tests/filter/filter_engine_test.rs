// tests/filter/filter_engine_test.rs
#[path = "../common/mod.rs"]
mod common;

use quarry::composition::ReportComposition;
use quarry::error::ReportError;
use quarry::executor::{InMemoryDataSource, QueryExecutor, QueryRequest};
use quarry::filter::{operators_for, Combinator, FilterGroup, FilterOperator, FilterValue};
use quarry::schema::{FieldRef, SchemaCatalog, SemanticType};
use quarry::value::Value;

use std::sync::Arc;

struct Fixture {
    catalog: Arc<SchemaCatalog>,
    executor: QueryExecutor<InMemoryDataSource>,
    composition: ReportComposition,
}

fn fixture() -> Fixture {
    let executor = common::hr_executor().with_page_size(100);
    let catalog = Arc::clone(executor.catalog());
    let composition = ReportComposition::with_all_columns(&catalog, "employees").unwrap();
    Fixture {
        catalog,
        executor,
        composition,
    }
}

async fn first_names(fx: &Fixture, filters: &FilterGroup) -> Vec<String> {
    let result = fx
        .executor
        .execute(&fx.composition, filters, &QueryRequest::default())
        .await
        .unwrap();
    result
        .rows
        .iter()
        .map(|r| r["employees.first_name"].to_string())
        .collect()
}

#[test]
fn test_operator_sets_by_type() {
    use FilterOperator::*;
    assert_eq!(
        operators_for(SemanticType::Date),
        &[Equals, NotEquals, GreaterThan, LessThan, OnOrAfter, OnOrBefore]
    );
    assert_eq!(
        operators_for(SemanticType::String),
        &[Equals, NotEquals, Contains, StartsWith, EndsWith]
    );
    assert_eq!(operators_for(SemanticType::Integer), operators_for(SemanticType::Decimal));
    assert_eq!(operators_for(SemanticType::Boolean), &[Equals]);
}

#[test]
fn test_add_condition_defaults() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();

    let condition = filters.condition(id).unwrap();
    assert_eq!(condition.field, FieldRef::new("employees", "id"));
    assert_eq!(condition.operator, FilterOperator::Equals);
    assert!(condition.value.is_unset());
}

#[tokio::test]
async fn test_equals_then_contains_scenario() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    filters
        .set_field(id, FieldRef::new("employees", "first_name"), &fx.composition, &fx.catalog)
        .unwrap();
    filters.set_value(id, "John", &fx.catalog).unwrap();

    let exact = first_names(&fx, &filters).await;
    assert_eq!(exact, vec!["John"]);

    filters.set_operator(id, FilterOperator::Contains, &fx.catalog).unwrap();
    filters.set_value(id, "Jo", &fx.catalog).unwrap();
    let partial = first_names(&fx, &filters).await;
    assert_eq!(partial, vec!["John", "Johnny", "Joan", "Jonah"]);
    assert!(exact.iter().all(|name| partial.contains(name)));
}

#[tokio::test]
async fn test_unset_condition_is_not_active() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    assert!(!filters.is_active());
    assert_eq!(first_names(&fx, &filters).await.len(), 23);
}

#[test]
fn test_set_field_resets_invalid_operator() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    filters
        .set_field(id, FieldRef::new("employees", "last_name"), &fx.composition, &fx.catalog)
        .unwrap();
    filters.set_operator(id, FilterOperator::EndsWith, &fx.catalog).unwrap();
    filters.set_value(id, "07", &fx.catalog).unwrap();

    filters
        .set_field(id, FieldRef::new("employees", "hire_date"), &fx.composition, &fx.catalog)
        .unwrap();
    let condition = filters.condition(id).unwrap();
    assert_eq!(condition.operator, FilterOperator::Equals);
    // "07" is not a date
    assert!(condition.value.is_unset());
}

#[test]
fn test_invalid_operator_and_value() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();

    let err = filters
        .set_operator(id, FilterOperator::Contains, &fx.catalog)
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidOperator { .. }));

    let err = filters.set_value(id, "twelve", &fx.catalog).unwrap_err();
    assert_eq!(
        err,
        ReportError::InvalidFilterValue {
            field: "employees.id".into(),
            value: "twelve".into(),
            expected: SemanticType::Integer,
        }
    );
    assert!(filters.condition(id).unwrap().value.is_unset());
}

#[test]
fn test_field_outside_composition_rejected() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    // departments is in the catalog but not in this composition
    assert!(filters
        .set_field(id, FieldRef::new("departments", "name"), &fx.composition, &fx.catalog)
        .is_err());
}

#[tokio::test]
async fn test_date_comparisons() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    filters
        .set_field(id, FieldRef::new("employees", "hire_date"), &fx.composition, &fx.catalog)
        .unwrap();
    filters.set_operator(id, FilterOperator::OnOrAfter, &fx.catalog).unwrap();
    filters.set_value(id, "03/20/2021", &fx.catalog).unwrap();

    assert_eq!(
        filters.condition(id).unwrap().value,
        FilterValue::Date(chrono::NaiveDate::from_ymd_opt(2021, 3, 20).unwrap())
    );
    assert_eq!(first_names(&fx, &filters).await, vec!["Paul", "Rosa", "Sam", "Zoe"]);

    filters.set_operator(id, FilterOperator::GreaterThan, &fx.catalog).unwrap();
    assert_eq!(first_names(&fx, &filters).await.len(), 3);
}

#[tokio::test]
async fn test_nested_or_group() {
    let fx = fixture();
    let mut filters = FilterGroup::default();
    let root = filters.id;
    let group = filters.add_group(root, Combinator::Or).unwrap();

    let asha = filters.add_condition(group, &fx.composition, &fx.catalog).unwrap();
    filters
        .set_field(asha, FieldRef::new("employees", "first_name"), &fx.composition, &fx.catalog)
        .unwrap();
    filters.set_value(asha, "Asha", &fx.catalog).unwrap();

    let ra = filters.add_condition(group, &fx.composition, &fx.catalog).unwrap();
    filters
        .set_field(ra, FieldRef::new("employees", "first_name"), &fx.composition, &fx.catalog)
        .unwrap();
    filters.set_operator(ra, FilterOperator::StartsWith, &fx.catalog).unwrap();
    filters.set_value(ra, "Ra", &fx.catalog).unwrap();

    assert_eq!(first_names(&fx, &filters).await, vec!["Asha", "Rahul", "Ravi"]);

    // AND of the OR group with id < 6 drops Ravi
    let low = filters.add_condition(root, &fx.composition, &fx.catalog).unwrap();
    filters.set_operator(low, FilterOperator::LessThan, &fx.catalog).unwrap();
    filters.set_value(low, "6", &fx.catalog).unwrap();
    assert_eq!(first_names(&fx, &filters).await, vec!["Asha"]);

    filters.remove(group).unwrap();
    assert_eq!(filters.conditions().len(), 1);
    filters.clear();
    assert!(filters.is_empty());
    assert_eq!(first_names(&fx, &filters).await.len(), 23);
}

#[tokio::test]
async fn test_filter_on_joined_table() {
    let fx = fixture();
    let mut composition = fx.composition.clone();
    composition.add_table(&fx.catalog, "departments").unwrap();

    let mut filters = FilterGroup::default();
    let root = filters.id;
    let id = filters.add_condition(root, &composition, &fx.catalog).unwrap();
    filters
        .set_field(id, FieldRef::new("departments", "name"), &composition, &fx.catalog)
        .unwrap();
    filters.set_value(id, "Sales", &fx.catalog).unwrap();

    let result = fx
        .executor
        .execute(&composition, &filters, &QueryRequest::default())
        .await
        .unwrap();
    assert_eq!(result.total_rows, 7);
    // departments.name is not selected, so it is not projected
    assert!(result.rows.iter().all(|r| !r.contains_key("departments.name")));
    assert!(result
        .rows
        .iter()
        .all(|r| r["employees.department_id"] == Value::Integer(2)));
}
