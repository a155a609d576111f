// tests/registry/registry_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use quarry::auth::{AccessPolicy, Role, StaticAccess};
use quarry::error::{Action, ObjectKind, ReportError};
use quarry::preferences::{LoadSource, PreferenceRecord, PreferenceStore, SqlitePreferenceStore};
use quarry::registry::{InMemoryRegistry, ReportManager, ReportMetadata, ReportRegistry};
use quarry::session::ReportSession;

fn registry() -> Arc<InMemoryRegistry> {
    Arc::new(InMemoryRegistry::with_reports([
        ReportMetadata::new("headcount", "Headcount", "employees").with_category("People"),
        ReportMetadata::new("depts", "Departments", "departments").with_category("Org"),
        ReportMetadata::new("directory", "Directory", "employees").with_category("People"),
    ]))
}

fn store() -> Arc<PreferenceStore> {
    Arc::new(PreferenceStore::new(Arc::new(
        SqlitePreferenceStore::open_in_memory().unwrap(),
    )))
}

fn manager(
    registry: &Arc<InMemoryRegistry>,
    store: &Arc<PreferenceStore>,
    access: impl AccessPolicy + 'static,
) -> ReportManager {
    ReportManager::new(registry.clone(), Arc::clone(store), Arc::new(access))
}

#[test]
fn test_list_by_category_then_title() {
    let ids: Vec<String> = registry().list_reports().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["depts", "directory", "headcount"]);
}

#[tokio::test]
async fn test_copy_carries_saved_preferences() {
    let registry = registry();
    let store = store();

    let mut session = ReportSession::open(
        "headcount",
        "employees",
        common::hr_executor(),
        &store,
        Arc::new(Role::Editor),
    )
    .await
    .unwrap();
    session.toggle_column("employees", "email").unwrap();
    session.save(&store).unwrap();

    assert!(matches!(
        manager(&registry, &store, Role::Viewer).copy_as_new("headcount", "Nope"),
        Err(ReportError::AccessDenied {
            action: Action::Copy,
            ..
        })
    ));
    let copy = manager(&registry, &store, Role::Editor)
        .copy_as_new("headcount", "Headcount (copy)")
        .unwrap();
    assert_ne!(copy.id, "headcount");
    assert_eq!(copy.category, "People");
    assert_eq!(copy.primary_table, "employees");
    assert!(copy.last_viewed_at.is_none());
    assert_eq!(registry.get(&copy.id).unwrap().title, "Headcount (copy)");
    assert_eq!(registry.list_reports().len(), 4);

    let loaded = store.load(&copy.id, "employees").await;
    assert_eq!(loaded.source, LoadSource::Local);
    assert_eq!(loaded.record.tables, session.to_record().tables);
    assert_eq!(loaded.record.report_id, copy.id);
}

#[tokio::test]
async fn test_copy_without_saved_preferences() {
    let registry = registry();
    let store = store();
    let copy = manager(&registry, &store, StaticAccess::full())
        .copy_as_new("depts", "Departments 2")
        .unwrap();
    assert_eq!(
        store.load(&copy.id, "departments").await.source,
        LoadSource::Default
    );
}

#[test]
fn test_copy_unknown_report() {
    let registry = registry();
    let store = store();
    let err = manager(&registry, &store, StaticAccess::full())
        .copy_as_new("payroll", "Payroll")
        .unwrap_err();
    assert_eq!(err, ReportError::not_found(ObjectKind::Report, "payroll"));
    assert_eq!(registry.list_reports().len(), 3);
}

#[tokio::test]
async fn test_delete_requires_delete_access() {
    let registry = registry();
    let store = store();
    let mut record = PreferenceRecord::default_for("headcount", "employees");
    record.tables[0].selected_columns = vec!["id".into()];
    store.save(&record).unwrap();

    for access in [Role::Editor, Role::Viewer] {
        let err = manager(&registry, &store, access).delete("headcount").unwrap_err();
        assert_eq!(
            err,
            ReportError::AccessDenied {
                report_id: "headcount".into(),
                action: Action::Delete
            }
        );
    }
    // refused deletes change nothing
    assert!(registry.get("headcount").is_ok());
    assert_eq!(store.load("headcount", "employees").await.record, record);

    let removed = manager(&registry, &store, Role::Admin).delete("headcount").unwrap();
    assert_eq!(removed.title, "Headcount");
    assert!(registry.get("headcount").is_err());
    assert_eq!(
        store.load("headcount", "employees").await.source,
        LoadSource::Default
    );
}

#[test]
fn test_delete_unknown_report() {
    let registry = registry();
    let store = store();
    assert!(matches!(
        manager(&registry, &store, Role::Admin).delete("payroll"),
        Err(ReportError::NotFound { .. })
    ));
}
