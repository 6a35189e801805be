//! Integration tests for in-place anonymization runs

mod common;

use common::{users, MockDatabase};
use std::sync::Arc;
use veil::adapters::database::Database;
use veil::core::anonymizer::{Anonymizer, AnonymizerSettings};
use veil::core::summary::RunMode;
use veil::domain::{Row, SqlValue, VeilError};
use veil::generator::{FakeGenerator, Locale};

fn settings(max_in_flight: usize) -> AnonymizerSettings {
    AnonymizerSettings {
        max_in_flight,
        ..AnonymizerSettings::default()
    }
}

fn anonymizer(db: &Arc<MockDatabase>, max_in_flight: usize) -> Anonymizer {
    let source: Arc<dyn Database> = db.clone();
    Anonymizer::new(source, settings(max_in_flight))
}

#[tokio::test]
async fn test_row_placeholder_follows_fetch_order() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(3)));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| t.column("email").replace_with("email_#row#@example.com"))
        .unwrap();

    let summary = anonymizer.run().await.unwrap();

    assert_eq!(summary.mode, RunMode::InPlace);
    assert_eq!(summary.tables.len(), 1);
    assert_eq!(summary.tables[0].rows_read, 3);
    assert_eq!(summary.tables[0].statements, 3);

    let mut writes = db.writes();
    writes.sort();
    assert_eq!(
        writes,
        vec![
            "UPDATE `users` SET `email` = 'email_0@example.com' WHERE `id` = 1",
            "UPDATE `users` SET `email` = 'email_1@example.com' WHERE `id` = 2",
            "UPDATE `users` SET `email` = 'email_2@example.com' WHERE `id` = 3",
        ]
    );
}

#[tokio::test]
async fn test_row_filter_is_left_to_the_database() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(2)));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| {
            t.column("email")
                .filter("id != 1")
                .replace_with("hidden@example.com")
        })
        .unwrap();

    anonymizer.run().await.unwrap();

    for statement in db.statements() {
        assert!(statement
            .sql()
            .starts_with("UPDATE `users` SET `email` = (CASE WHEN id != 1 THEN ? ELSE `email` END)"));
        assert!(statement.sql().ends_with("WHERE `id` = ?"));
    }
    assert_eq!(db.statements().len(), 2);
}

#[tokio::test]
async fn test_waves_never_exceed_ceiling() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(25)));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| t.column("email").replace_with("x@example.com"))
        .unwrap();

    let summary = anonymizer.run().await.unwrap();

    assert_eq!(summary.tables[0].statements, 25);
    assert_eq!(summary.tables[0].waves, 3);
    assert_eq!(db.peak_in_flight(), 10);
}

#[tokio::test]
async fn test_primary_key_never_updated() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(4)));
    let mut anonymizer = anonymizer(&db, 2);
    anonymizer
        .table("users", |t| {
            t.column("first_name")
                .replace_with("Anon")
                .column("last_name")
                .replace_with("Ymous")
        })
        .unwrap();

    anonymizer.run().await.unwrap();

    for statement in db.statements() {
        let set_clause = statement.sql().split(" WHERE ").next().unwrap();
        assert!(!set_clause.contains("`id`"));
    }
}

#[tokio::test]
async fn test_generated_and_derived_values() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(2)));
    let source: Arc<dyn Database> = db.clone();
    let mut anonymizer = Anonymizer::new(source, settings(5))
        .with_generator(Arc::new(FakeGenerator::seeded(Locale::EnUs, 7)));
    anonymizer
        .table("users", |t| {
            t.column("last_name")
                .replace_with_generated(|g| g.generate("last_name"))
                .column("email")
                .replace_by_fields(|row: &Row, _| {
                    let first = row.get("first_name").and_then(SqlValue::as_text).unwrap_or("");
                    Ok(SqlValue::from(format!("{}@example.com", first.to_lowercase())))
                })
        })
        .unwrap();

    anonymizer.run().await.unwrap();

    let writes = db.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().any(|w| w.contains("'first1@example.com'")));
    assert!(writes.iter().any(|w| w.contains("'first2@example.com'")));
    assert!(writes.iter().all(|w| !w.contains("'Last1'") && !w.contains("'Last2'")));
}

#[tokio::test]
async fn test_generated_rule_without_generator_fails() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(1)));
    let mut anonymizer = anonymizer(&db, 5);
    anonymizer
        .table("users", |t| {
            t.column("last_name")
                .replace_with_generated(|g| g.generate("last_name"))
        })
        .unwrap();

    let err = anonymizer.run().await.unwrap_err();
    assert!(matches!(err, VeilError::GeneratorRequired(_)));
    assert!(db.writes().is_empty());
}

#[tokio::test]
async fn test_sync_triggers_wrap_the_updates() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(3)));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| {
            t.column("email")
                .replace_with("user_#row#@example.com")
                .sync("email")
                .to("orders", "customer_email")
        })
        .unwrap();

    let summary = anonymizer.run().await.unwrap();
    assert_eq!(summary.tables[0].triggers, 1);

    let create = db.position("CREATE TRIGGER `veil_sync_users_email`").unwrap();
    let first_update = db.position("UPDATE `users`").unwrap();
    let last_update = db.last_position("UPDATE `users`").unwrap();
    let drop = db
        .last_position("DROP TRIGGER IF EXISTS `veil_sync_users_email`")
        .unwrap();
    assert!(create < first_update);
    assert!(last_update < drop);
    assert!(anonymizer.blueprints()[0].active_triggers().is_empty());
}

#[tokio::test]
async fn test_failed_update_still_drops_triggers() {
    let db = Arc::new(
        MockDatabase::new("shop")
            .on_query("FROM `users`", users(3))
            .fail_on("WHERE `id` = 2"),
    );
    let mut anonymizer = anonymizer(&db, 1);
    anonymizer
        .table("users", |t| {
            t.column("email")
                .replace_with("x@example.com")
                .sync("email")
                .to("orders", "customer_email")
        })
        .unwrap();

    let err = anonymizer.run().await.unwrap_err();
    assert!(matches!(err, VeilError::Database(_)));

    let writes = db.writes();
    assert!(writes.last().unwrap().starts_with("DROP TRIGGER IF EXISTS"));
    assert!(!writes.iter().any(|w| w.contains("WHERE `id` = 3")));
    assert!(anonymizer.blueprints()[0].active_triggers().is_empty());
}

#[tokio::test]
async fn test_tables_run_in_registration_order() {
    let db = Arc::new(
        MockDatabase::new("shop")
            .on_query("FROM `users`", users(2))
            .on_query("FROM `orders`", vec![Row::new().with("id", 10).with("note", "x")]),
    );
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("orders", |t| t.column("note").replace_with(""))
        .unwrap()
        .table("users", |t| t.column("email").replace_with("x"))
        .unwrap();

    let summary = anonymizer.run().await.unwrap();

    let order: Vec<&str> = summary.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(order, vec!["orders", "users"]);
    assert!(db.last_position("UPDATE `orders`").unwrap() < db.position("UPDATE `users`").unwrap());
}

#[tokio::test]
async fn test_retain_tables_subset() {
    let db = Arc::new(MockDatabase::new("shop").on_query("FROM `users`", users(1)));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("orders", |t| t.column("note").replace_with(""))
        .unwrap()
        .table("users", |t| t.column("email").replace_with("x"))
        .unwrap();

    anonymizer.retain_tables(&["users".to_string()]).unwrap();
    let summary = anonymizer.run().await.unwrap();
    assert_eq!(summary.tables.len(), 1);
    assert_eq!(summary.tables[0].table, "users");

    let err = anonymizer.retain_tables(&["missing".to_string()]).unwrap_err();
    assert!(matches!(err, VeilError::Configuration(_)));
}

#[test]
fn test_duplicate_registration_rejected() {
    let db = Arc::new(MockDatabase::new("shop"));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| t.column("email").replace_with("x"))
        .unwrap();
    let err = anonymizer
        .table("users", |t| t.column("name").replace_with("y"))
        .err()
        .unwrap();
    assert!(matches!(err, VeilError::Configuration(_)));
}

#[test]
fn test_overlapping_sync_targets_rejected() {
    let db = Arc::new(MockDatabase::new("shop"));
    let mut anonymizer = anonymizer(&db, 10);
    anonymizer
        .table("users", |t| t.sync("email").to("orders", "email"))
        .unwrap();
    let err = anonymizer
        .table("customers", |t| t.sync("email").to("orders", "email"))
        .err()
        .unwrap();
    assert!(err.to_string().contains("already synchronized"));
}

#[tokio::test]
async fn test_empty_registry_is_a_noop() {
    let db = Arc::new(MockDatabase::new("shop"));
    let summary = anonymizer(&db, 10).run().await.unwrap();
    assert!(summary.tables.is_empty());
    assert!(db.writes().is_empty());
}
