// tests/schema/join_resolver_test.rs
use quarry::composition::{JoinResolver, ReportComposition};
use quarry::error::ReportError;
use quarry::schema::{Column, ForeignKey, JoinEdge, SchemaCatalog, SemanticType, Table};

fn int(name: &str) -> Column {
    Column::new(name, SemanticType::Integer)
}

/// customers <- orders <- order_items -> products, orders <- shipments,
/// and an unlinked regions table.
fn sales_catalog() -> SchemaCatalog {
    SchemaCatalog::new(vec![
        Table::new("customers")
            .with_column(int("id"))
            .with_column(Column::new("name", SemanticType::String)),
        Table::new("orders")
            .with_column(int("id"))
            .with_column(int("customer_id"))
            .with_foreign_key(ForeignKey::new("customer_id", "customers", "id")),
        Table::new("products")
            .with_column(int("id"))
            .with_column(Column::new("sku", SemanticType::String)),
        Table::new("order_items")
            .with_column(int("id"))
            .with_column(int("order_id"))
            .with_column(int("product_id"))
            .with_foreign_key(ForeignKey::new("order_id", "orders", "id"))
            .with_foreign_key(ForeignKey::new("product_id", "products", "id")),
        Table::new("shipments")
            .with_column(int("id"))
            .with_column(int("order_id"))
            .with_foreign_key(ForeignKey::new("order_id", "orders", "id")),
        Table::new("regions").with_column(int("id")),
    ])
    .unwrap()
}

fn edge(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> JoinEdge {
    JoinEdge {
        from_table: from_table.into(),
        from_column: from_column.into(),
        to_table: to_table.into(),
        to_column: to_column.into(),
    }
}

#[test]
fn test_direct_path_follows_foreign_key() {
    let catalog = sales_catalog();
    let path = JoinResolver::new(&catalog).path_to("orders", "customers").unwrap();
    assert_eq!(path.edges, vec![edge("orders", "customer_id", "customers", "id")]);
}

#[test]
fn test_reverse_path_flips_columns() {
    let catalog = sales_catalog();
    let path = JoinResolver::new(&catalog).path_to("customers", "orders").unwrap();
    assert_eq!(path.edges, vec![edge("customers", "id", "orders", "customer_id")]);
}

#[test]
fn test_transitive_path() {
    let catalog = sales_catalog();
    let path = JoinResolver::new(&catalog).path_to("customers", "products").unwrap();
    assert_eq!(
        path.edges,
        vec![
            edge("customers", "id", "orders", "customer_id"),
            edge("orders", "id", "order_items", "order_id"),
            edge("order_items", "product_id", "products", "id"),
        ]
    );
}

#[test]
fn test_unjoinable_table() {
    let catalog = sales_catalog();
    let err = JoinResolver::new(&catalog)
        .resolve("customers", &["regions"])
        .unwrap_err();
    assert_eq!(
        err,
        ReportError::Unjoinable {
            table: "regions".into(),
            primary: "customers".into()
        }
    );
}

#[test]
fn test_unjoinable_add_leaves_composition_unchanged() {
    let catalog = sales_catalog();
    let mut composition = ReportComposition::with_all_columns(&catalog, "orders").unwrap();
    composition.add_table(&catalog, "customers").unwrap();
    let before = composition.clone();

    assert!(matches!(
        composition.add_table(&catalog, "regions"),
        Err(ReportError::Unjoinable { .. })
    ));
    assert_eq!(composition, before);
}

#[test]
fn test_tie_broken_by_declaration_order() {
    let catalog = SchemaCatalog::new(vec![
        Table::new("a")
            .with_column(int("id"))
            .with_column(int("b_id"))
            .with_column(int("c_id"))
            .with_foreign_key(ForeignKey::new("b_id", "b", "id"))
            .with_foreign_key(ForeignKey::new("c_id", "c", "id")),
        Table::new("b")
            .with_column(int("id"))
            .with_column(int("d_id"))
            .with_foreign_key(ForeignKey::new("d_id", "d", "id")),
        Table::new("c")
            .with_column(int("id"))
            .with_column(int("d_id"))
            .with_foreign_key(ForeignKey::new("d_id", "d", "id")),
        Table::new("d").with_column(int("id")),
    ])
    .unwrap();

    for _ in 0..5 {
        let path = JoinResolver::new(&catalog).path_to("a", "d").unwrap();
        assert_eq!(path.tables(), vec!["a", "b", "d"]);
    }
}

#[test]
fn test_plan_includes_bridge_tables_once() {
    let catalog = sales_catalog();
    let plan = JoinResolver::new(&catalog)
        .resolve("customers", &["products", "shipments"])
        .unwrap();

    assert_eq!(
        plan.tables(),
        vec!["customers", "orders", "order_items", "products", "shipments"]
    );
    assert_eq!(plan.len(), 4);
    assert_eq!(plan.edges[3], edge("orders", "id", "shipments", "order_id"));
}

#[test]
fn test_composition_keeps_bridge_tables_out() {
    let catalog = sales_catalog();
    let mut composition = ReportComposition::with_all_columns(&catalog, "customers").unwrap();
    composition.add_table(&catalog, "products").unwrap();

    assert_eq!(composition.table_names(), vec!["customers", "products"]);
    let plan = composition.join_plan(&catalog).unwrap();
    assert!(plan.contains("orders"));
    assert!(plan.contains("order_items"));
}
