// tests/composition/column_selection_test.rs
#[path = "../common/mod.rs"]
mod common;

use quarry::composition::{remove_table_cascade, ReportComposition};
use quarry::error::ReportError;
use quarry::filter::{FilterCondition, FilterGroup, FilterValue};
use quarry::schema::{FieldRef, SemanticType};

fn hr_composition() -> ReportComposition {
    let catalog = common::hr_catalog();
    let mut composition = ReportComposition::new(&catalog, "employees").unwrap();
    composition.add_table(&catalog, "departments").unwrap();
    composition
}

#[test]
fn test_primary_table_is_protected() {
    let mut composition = hr_composition();
    assert!(!composition.can_remove("employees"));
    assert!(composition.can_remove("departments"));

    let before = composition.clone();
    assert_eq!(
        composition.remove_table("employees"),
        Err(ReportError::PrimaryTableProtected("employees".into()))
    );
    assert_eq!(composition, before);
}

#[test]
fn test_select_all_then_deselect_all_scenario() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    composition.select_all(&catalog, "departments").unwrap();

    composition.select_all(&catalog, "employees").unwrap();
    assert_eq!(composition.selected_count("employees").unwrap(), 6);
    assert_eq!(
        composition.column_counter(&catalog, "employees").unwrap().to_string(),
        "6 of 6 columns selected"
    );

    composition.deselect_all("employees").unwrap();
    assert_eq!(composition.selected_count("employees").unwrap(), 0);
    assert_eq!(composition.selected_count("departments").unwrap(), 2);
    assert_eq!(
        composition.column_counter(&catalog, "employees").unwrap().to_string(),
        "0 of 6 columns selected"
    );
}

#[test]
fn test_select_all_is_idempotent() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    composition.toggle(&catalog, "employees", "email").unwrap();

    composition.select_all(&catalog, "employees").unwrap();
    let once = composition.selection("employees").unwrap().selected.clone();
    composition.select_all(&catalog, "employees").unwrap();
    assert_eq!(composition.selection("employees").unwrap().selected, once);
    // existing selection keeps its place
    assert_eq!(once[0], "email");
    assert_eq!(once.len(), 6);

    composition.deselect_all("employees").unwrap();
    composition.deselect_all("employees").unwrap();
    assert_eq!(composition.selected_count("employees").unwrap(), 0);
}

#[test]
fn test_counter_follows_every_toggle() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    for (i, column) in ["id", "first_name", "last_name"].iter().enumerate() {
        composition.toggle(&catalog, "employees", column).unwrap();
        assert_eq!(
            composition.column_counter(&catalog, "employees").unwrap().selected,
            i + 1
        );
    }
    composition.toggle(&catalog, "employees", "first_name").unwrap();
    assert_eq!(
        composition.selection("employees").unwrap().selected,
        vec!["id", "last_name"]
    );
}

#[test]
fn test_toggle_unknown_column() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    assert!(matches!(
        composition.toggle(&catalog, "employees", "salary"),
        Err(ReportError::NotFound { .. })
    ));
}

#[test]
fn test_reorder_permutation() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    composition.toggle(&catalog, "departments", "name").unwrap();
    composition.toggle(&catalog, "departments", "id").unwrap();

    composition.reorder("departments", &["id", "name"]).unwrap();
    let keys: Vec<String> = composition
        .selected_fields()
        .iter()
        .map(FieldRef::key)
        .collect();
    assert_eq!(keys, vec!["departments.id", "departments.name"]);
}

#[test]
fn test_reorder_rejects_non_permutations() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    composition.toggle(&catalog, "departments", "name").unwrap();
    composition.toggle(&catalog, "departments", "id").unwrap();
    let before = composition.clone();

    for order in [vec!["id"], vec!["id", "id"], vec!["id", "name", "name"], vec!["id", "code"]] {
        assert!(matches!(
            composition.reorder("departments", &order),
            Err(ReportError::InvalidReorder { .. })
        ));
        assert_eq!(composition, before);
    }
}

#[test]
fn test_duplicate_table_rejected() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    assert_eq!(
        composition.add_table(&catalog, "departments"),
        Err(ReportError::DuplicateTable("departments".into()))
    );
}

#[test]
fn test_remove_table_cascades_to_filters() {
    let catalog = common::hr_catalog();
    let mut composition = hr_composition();
    composition.select_all(&catalog, "departments").unwrap();
    composition.toggle(&catalog, "employees", "first_name").unwrap();

    let mut filters = FilterGroup::default()
        .with_condition(
            FilterCondition::new(FieldRef::new("departments", "name"), SemanticType::String)
                .with_value(FilterValue::String("Sales".into())),
        )
        .with_condition(
            FilterCondition::new(FieldRef::new("employees", "first_name"), SemanticType::String)
                .with_value(FilterValue::String("John".into())),
        );

    let summary = remove_table_cascade(&mut composition, &mut filters, "departments").unwrap();
    assert_eq!(summary.removed_columns, 2);
    assert_eq!(summary.removed_conditions, 1);
    assert_eq!(composition.table_names(), vec!["employees"]);
    assert_eq!(filters.conditions().len(), 1);
    assert_eq!(filters.conditions()[0].field.table, "employees");
}

#[test]
fn test_cascade_on_primary_changes_nothing() {
    let mut composition = hr_composition();
    let mut filters = FilterGroup::default().with_condition(FilterCondition::new(
        FieldRef::new("employees", "id"),
        SemanticType::Integer,
    ));
    let before = (composition.clone(), filters.clone());

    assert!(remove_table_cascade(&mut composition, &mut filters, "employees").is_err());
    assert_eq!((composition, filters), before);
}
