mod common;

use common::{Order, RecordingExecutor, order_record, placed_on};
use pgfluent::prelude::*;
use pgfluent::{AssociationMeta, MetadataRegistry};

fn orders() -> EntityQb {
    EntityQb::for_entity::<Order>().select_from_entity(None)
}

#[test]
fn derived_metadata_describes_the_struct() {
    let meta = Order::metadata();
    assert_eq!(meta.name(), "Order");
    assert_eq!(meta.table(), "orders");
    assert_eq!(meta.alias(), Some("o"));
    assert_eq!(meta.identifier(), vec!["id"]);
    assert_eq!(meta.type_of_field("amount"), Some(FieldType::Decimal));
    assert_eq!(meta.type_of_field("created_at"), Some(FieldType::DateTime));
    assert_eq!(meta.column_for("created_at"), Some("placed_on"));
    assert!(meta.field("note").is_some_and(|f| f.nullable));

    let customer = meta.association("customer").unwrap();
    assert_eq!(
        customer,
        &AssociationMeta::new("customer", "Customer")
            .target_table("customers")
            .nullable()
    );
    assert_eq!(meta.column_for("customer"), Some("customer_id"));
}

#[test]
fn derived_metadata_is_shared() {
    assert!(std::sync::Arc::ptr_eq(&Order::metadata(), &Order::metadata()));
}

#[test]
fn derived_from_record_reads_mapped_columns() {
    let order = Order::from_record(&order_record(3, "paid", 1999)).unwrap();
    assert_eq!(
        order,
        Order {
            id: 3,
            status: "paid".to_string(),
            amount: Decimal::new(1999, 2),
            created_at: placed_on(1),
            note: None,
            customer: Some(7),
        }
    );

    let missing = Record::new().with("id", 1i64);
    assert!(matches!(
        Order::from_record(&missing),
        Err(OrmError::Decode { .. })
    ));
}

#[tokio::test]
async fn fetch_all_runs_the_compiled_query() {
    let conn = RecordingExecutor::new()
        .respond(vec![order_record(1, "paid", 1000), order_record(2, "shipped", 2500)]);

    let found: Vec<Order> = orders()
        .call("statusIn", args![vec!["paid", "shipped"]])
        .unwrap()
        .call("andAmountGreaterThanEqual", args!["10.00"])
        .unwrap()
        .call("orderDescByCreatedAt", args![])
        .unwrap()
        .limit(20, None)
        .unwrap()
        .fetch_all(&conn)
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[1].status, "shipped");

    let (query, mode) = conn.last_fetch();
    assert_eq!(mode, HydrationMode::Object);
    assert_eq!(
        query.sql,
        "SELECT o.* FROM orders o WHERE o.status IN ($1, $2) AND o.amount >= $3 \
         ORDER BY o.placed_on DESC LIMIT 20"
    );
    assert_eq!(
        query.params,
        vec![
            Value::from("paid"),
            Value::from("shipped"),
            Value::Decimal(Decimal::new(1000, 2)),
        ]
    );
}

#[tokio::test]
async fn fetch_one_limits_to_one_row() {
    let conn = RecordingExecutor::new().respond(vec![order_record(5, "paid", 100)]);
    let order = orders()
        .call("idEqual", args![5])
        .unwrap()
        .fetch_one::<Order>(&conn)
        .await
        .unwrap();
    assert_eq!(order.map(|o| o.id), Some(5));
    assert_eq!(
        conn.last_fetch().0.sql,
        "SELECT o.* FROM orders o WHERE o.id = $1 LIMIT 1"
    );
}

#[tokio::test]
async fn fetch_one_semantics() {
    let conn = RecordingExecutor::new();
    let none = orders().fetch_one::<Order>(&conn).await.unwrap();
    assert!(none.is_none());

    let conn = RecordingExecutor::new()
        .respond(vec![order_record(1, "paid", 100), order_record(2, "paid", 100)]);
    let err = orders().fetch_one::<Order>(&conn).await.unwrap_err();
    assert!(matches!(err, OrmError::NonUniqueResult(2)));
}

#[tokio::test]
async fn fetch_single_requires_a_row() {
    let conn = RecordingExecutor::new();
    let err = orders().fetch_single::<Order>(&conn).await.unwrap_err();
    assert!(err.is_no_result());

    let conn = RecordingExecutor::new().respond(vec![order_record(9, "new", 1)]);
    let order = orders().fetch_single::<Order>(&conn).await.unwrap();
    assert_eq!(order.id, 9);
    assert_eq!(conn.last_fetch().0.sql, "SELECT o.* FROM orders o LIMIT 1");
}

#[tokio::test]
async fn fetch_single_windows_a_filtered_query() {
    let conn = RecordingExecutor::new().respond(vec![order_record(3, "paid", 250)]);
    let order = orders()
        .call("statusEqual", args!["paid"])
        .unwrap()
        .fetch_single::<Order>(&conn)
        .await
        .unwrap();
    assert_eq!(order.id, 3);

    let (query, mode) = conn.last_fetch();
    assert_eq!(mode, HydrationMode::Object);
    assert_eq!(query.sql, "SELECT o.* FROM orders o WHERE o.status = $1 LIMIT 1");
    assert_eq!(query.params, vec![Value::from("paid")]);
}

#[tokio::test]
async fn fetch_single_scalar_returns_first_column() {
    let conn = RecordingExecutor::new()
        .respond(vec![Record::new().with("max_amount", Decimal::new(4200, 2))]);
    let value = orders()
        .select(["MAX(o.amount) AS max_amount"])
        .fetch_single_scalar(&conn)
        .await
        .unwrap();
    assert_eq!(value, Value::Decimal(Decimal::new(4200, 2)));

    let (query, mode) = conn.last_fetch();
    assert_eq!(mode, HydrationMode::SingleScalar);
    assert_eq!(query.sql, "SELECT MAX(o.amount) AS max_amount FROM orders o LIMIT 1");
}

#[tokio::test]
async fn fetch_all_array_and_scalar_modes() {
    let conn = RecordingExecutor::new()
        .respond(vec![Record::new().with("status", "paid").with("n", 3i64)])
        .respond(vec![Record::new().with("id", 1i64), Record::new().with("id", 2i64)]);

    let rows = orders()
        .select(["status", "COUNT(o.id) AS n"])
        .call("groupByStatus", args![])
        .unwrap()
        .fetch_all_array(&conn)
        .await
        .unwrap();
    assert_eq!(rows[0]["status"], serde_json::json!("paid"));
    assert_eq!(rows[0]["n"], serde_json::json!(3));
    assert_eq!(conn.last_fetch().1, HydrationMode::Array);

    let ids = orders()
        .select(["id"])
        .fetch_all_scalar(&conn)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[1].first(), Some(&Value::Int(2)));
    assert_eq!(conn.last_fetch().1, HydrationMode::Scalar);
}

#[tokio::test]
async fn fetch_all_simple_uses_simple_mode() {
    let conn = RecordingExecutor::new().respond(vec![order_record(1, "paid", 100)]);
    let found = orders()
        .call("noteIsNull", args![])
        .unwrap()
        .fetch_all_simple::<Order>(&conn)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    let (query, mode) = conn.last_fetch();
    assert_eq!(mode, HydrationMode::SimpleObject);
    assert_eq!(query.sql, "SELECT o.* FROM orders o WHERE o.note IS NULL");
}

#[tokio::test]
async fn count_ignores_ordering_and_window() {
    let conn = RecordingExecutor::new().respond(vec![Record::new().with("count", 42i64)]);
    let total = orders()
        .call("statusEqual", args!["paid"])
        .unwrap()
        .call("orderByCreatedAt", args!["ASC"])
        .unwrap()
        .paginate(3, 10)
        .unwrap()
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(total, 42);
    assert_eq!(
        conn.last_fetch().0.sql,
        "SELECT COUNT(*) FROM orders o WHERE o.status = $1"
    );
}

#[tokio::test]
async fn execute_update_and_delete() {
    let conn = RecordingExecutor::with_affected(2);
    let affected = orders()
        .update()
        .set("status", "cancelled")
        .call("createdAtLessThan", args!["2024-01-01 00:00:00"])
        .unwrap()
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let affected = orders()
        .delete()
        .call("statusEqual", args!["cancelled"])
        .unwrap()
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let executed = conn.executed.lock().unwrap();
    assert_eq!(
        executed[0].sql,
        "UPDATE orders AS o SET status = $1 WHERE o.placed_on < $2"
    );
    assert_eq!(executed[1].sql, "DELETE FROM orders AS o WHERE o.status = $1");
}

#[tokio::test]
async fn unfiltered_mutations_are_refused_by_default() {
    let conn = RecordingExecutor::with_affected(10);
    let err = orders().delete().execute(&conn).await.unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert!(conn.executed.lock().unwrap().is_empty());

    let affected = orders()
        .with_config(QbConfig::new().allow_unfiltered_mutations(true))
        .unwrap()
        .delete()
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(affected, 10);
}

#[tokio::test]
async fn execute_rejects_select_sessions() {
    let conn = RecordingExecutor::new();
    let err = orders().execute(&conn).await.unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[tokio::test]
async fn dynamic_errors_surface_before_any_round_trip() {
    let conn = RecordingExecutor::new();
    let err = orders().call("filterByColour", args!["red"]).unwrap_err();
    match err {
        OrmError::UnrecognizedField { entity, field, .. } => {
            assert_eq!(entity, "Order");
            assert_eq!(field, "colour");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(conn.fetch_count(), 0);
}

#[test]
fn registry_builds_sessions_by_name() {
    let mut registry = MetadataRegistry::new();
    registry.register::<Order>().unwrap();
    assert!(registry.register::<Order>().is_err());

    let qb = registry.query_builder("Order").unwrap();
    assert_eq!(qb.to_dql(), "SELECT o FROM Order o");
    assert!(matches!(
        registry.query_builder("Invoice"),
        Err(OrmError::Metadata(_))
    ));
}
