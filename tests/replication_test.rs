//! Integration tests for replication into a target database

mod common;

use common::MockDatabase;
use std::sync::Arc;
use veil::adapters::database::Database;
use veil::core::anonymizer::{Anonymizer, AnonymizerSettings};
use veil::core::summary::RunMode;
use veil::domain::{Row, SqlValue, VeilError};

const USERS_DDL: &str = "CREATE TABLE `users` (
  `id` int NOT NULL AUTO_INCREMENT,
  `email` varchar(255) NOT NULL,
  `phone` varchar(32) DEFAULT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

const ORDERS_DDL: &str = "CREATE TABLE `orders` (
  `id` int NOT NULL AUTO_INCREMENT,
  `user_id` int NOT NULL,
  `parent_id` int DEFAULT NULL,
  `shop_id` int NOT NULL,
  PRIMARY KEY (`id`),
  KEY `fk_order_user` (`user_id`),
  CONSTRAINT `fk_order_parent` FOREIGN KEY (`parent_id`) REFERENCES `orders` (`id`),
  CONSTRAINT `fk_order_shop` FOREIGN KEY (`shop_id`) REFERENCES `shops` (`id`),
  CONSTRAINT `fk_order_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

fn key_usage(table: &str, name: &str, column: &str, ref_table: &str, on_delete: &str) -> Row {
    Row::new()
        .with("constraint_name", name)
        .with("table_name", table)
        .with("column_name", column)
        .with("referenced_table_name", ref_table)
        .with("referenced_column_name", "id")
        .with("update_rule", "NO ACTION")
        .with("delete_rule", on_delete)
}

fn create_table(table: &str, ddl: &str) -> Vec<Row> {
    vec![Row::new().with("Table", table).with("Create Table", ddl)]
}

fn source() -> MockDatabase {
    MockDatabase::new("shop")
        .on_query(
            "KEY_COLUMN_USAGE",
            vec![
                key_usage("orders", "fk_order_parent", "parent_id", "orders", "NO ACTION"),
                key_usage("orders", "fk_order_shop", "shop_id", "shops", "NO ACTION"),
                key_usage("orders", "fk_order_user", "user_id", "users", "CASCADE"),
            ],
        )
        .on_query("SHOW CREATE TABLE `users`", create_table("users", USERS_DDL))
        .on_query("SHOW CREATE TABLE `orders`", create_table("orders", ORDERS_DDL))
        .on_query(
            "FROM `users`",
            vec![
                Row::new()
                    .with("id", 1)
                    .with("email", "root@corp.example")
                    .with("phone", SqlValue::Null)
                    .with("__veil_filter_0", 0),
                Row::new()
                    .with("id", 2)
                    .with("email", "jane@corp.example")
                    .with("phone", "555-0100")
                    .with("__veil_filter_0", 1),
            ],
        )
        .on_query(
            "FROM `orders`",
            vec![Row::new()
                .with("id", 10)
                .with("user_id", 2)
                .with("parent_id", SqlValue::Null)
                .with("shop_id", 4)],
        )
}

fn replicator(source: &Arc<MockDatabase>, target: &Arc<MockDatabase>) -> Anonymizer {
    let source_db: Arc<dyn Database> = source.clone();
    let target_db: Arc<dyn Database> = target.clone();
    let mut anonymizer =
        Anonymizer::new(source_db, AnonymizerSettings::default()).with_target(target_db);
    anonymizer
        .table("users", |t| {
            t.column("email")
                .filter("id != 1")
                .replace_with("anon_#row#@example.com")
                .sync("email")
                .to("orders", "customer_email")
        })
        .unwrap()
        .table("orders", |t| t)
        .unwrap();
    anonymizer
}

#[tokio::test]
async fn test_replication_protocol_order() {
    let source = Arc::new(source());
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let mut anonymizer = replicator(&source, &target);

    let summary = anonymizer.run().await.unwrap();

    assert_eq!(summary.mode, RunMode::Replication);
    assert!(target.foreign_key_checks_disabled());
    assert_eq!(target.position("SET FOREIGN_KEY_CHECKS=0"), Some(0));

    let drop_users = target.position("DROP TABLE IF EXISTS `users`").unwrap();
    let create_users = target.position("CREATE TABLE `users`").unwrap();
    let insert_users = target.position("INSERT INTO `users`").unwrap();
    let create_orders = target.position("CREATE TABLE `orders`").unwrap();
    let last_insert = target.last_position("INSERT INTO").unwrap();
    let first_alter = target.position("ALTER TABLE").unwrap();
    assert!(drop_users < create_users);
    assert!(create_users < insert_users);
    assert!(insert_users < create_orders);
    assert!(last_insert < first_alter);

    assert!(source.writes().is_empty());
}

#[tokio::test]
async fn test_foreign_keys_stripped_then_restored() {
    let source = Arc::new(source());
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let mut anonymizer = replicator(&source, &target);

    let summary = anonymizer.run().await.unwrap();

    let writes = target.writes();
    let orders_ddl = writes
        .iter()
        .find(|w| w.starts_with("CREATE TABLE `orders`"))
        .unwrap();
    assert!(!orders_ddl.contains("CONSTRAINT `fk_order_user`"));
    assert!(!orders_ddl.contains("CONSTRAINT `fk_order_parent`"));
    assert!(orders_ddl.contains(
        "  CONSTRAINT `fk_order_shop` FOREIGN KEY (`shop_id`) REFERENCES `shops` (`id`)\n) ENGINE"
    ));

    assert_eq!(summary.constraints_restored, 2);
    assert!(writes.contains(
        &"ALTER TABLE `orders` ADD CONSTRAINT `fk_order_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE NO ACTION"
            .to_string()
    ));
    assert!(writes.contains(
        &"ALTER TABLE `orders` ADD CONSTRAINT `fk_order_parent` FOREIGN KEY (`parent_id`) REFERENCES `orders` (`id`) ON DELETE NO ACTION ON UPDATE NO ACTION"
            .to_string()
    ));
    assert!(!writes.iter().any(|w| w.contains("ADD CONSTRAINT `fk_order_shop`")));
}

#[tokio::test]
async fn test_inserts_copy_untouched_columns_and_nulls() {
    let source = Arc::new(source());
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let mut anonymizer = replicator(&source, &target);

    anonymizer.run().await.unwrap();

    let mut inserts: Vec<String> = target
        .writes()
        .into_iter()
        .filter(|w| w.starts_with("INSERT INTO `users`"))
        .collect();
    inserts.sort();
    assert_eq!(
        inserts,
        vec![
            "INSERT INTO `users` SET `email` = 'anon_1@example.com', `id` = 2, `phone` = '555-0100'",
            "INSERT INTO `users` SET `email` = 'root@corp.example', `id` = 1, `phone` = NULL",
        ]
    );

    let null_insert = target
        .statements()
        .into_iter()
        .find(|s| s.text().contains("`id` = 1"))
        .unwrap();
    assert_eq!(null_insert.params()[2], SqlValue::Null);

    assert!(target
        .writes()
        .contains(&"INSERT INTO `orders` SET `id` = 10, `user_id` = 2, `parent_id` = NULL, `shop_id` = 4".to_string()));
}

#[tokio::test]
async fn test_sync_rules_not_installed_when_replicating() {
    let source = Arc::new(source());
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let mut anonymizer = replicator(&source, &target);

    anonymizer.run().await.unwrap();

    assert!(target.position("TRIGGER").is_none());
    assert!(source.position("TRIGGER").is_none());
}

#[tokio::test]
async fn test_missing_definition_is_schema_mismatch() {
    let source = Arc::new(MockDatabase::new("shop"));
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let source_db: Arc<dyn Database> = source.clone();
    let target_db: Arc<dyn Database> = target.clone();
    let mut anonymizer =
        Anonymizer::new(source_db, AnonymizerSettings::default()).with_target(target_db);
    anonymizer.table("users", |t| t).unwrap();

    let err = anonymizer.run().await.unwrap_err();
    assert!(matches!(err, VeilError::SchemaMismatch(_)));
    assert!(target.position("CREATE TABLE").is_none());
}

#[tokio::test]
async fn test_failed_restore_aborts_after_load() {
    let source = Arc::new(source());
    let target = Arc::new(MockDatabase::new("shop_anon").fail_on("ADD CONSTRAINT `fk_order_parent`"));
    let mut anonymizer = replicator(&source, &target);

    let err = anonymizer.run().await.unwrap_err();
    assert!(matches!(err, VeilError::Database(_)));
    // Loaded rows stay on the target
    assert!(target.position("INSERT INTO `orders`").is_some());
}

#[tokio::test]
async fn test_generated_columns_left_to_the_target() {
    let source = Arc::new(
        MockDatabase::new("shop")
            .on_query(
                "TABLE_NAME = 'users'",
                vec![Row::new().with("column_name", "email_domain")],
            )
            .on_query("SHOW CREATE TABLE `users`", create_table("users", USERS_DDL))
            .on_query(
                "FROM `users`",
                vec![Row::new()
                    .with("id", 3)
                    .with("email", "joe@corp.example")
                    .with("email_domain", "corp.example")],
            ),
    );
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let source_db: Arc<dyn Database> = source.clone();
    let target_db: Arc<dyn Database> = target.clone();
    let mut anonymizer =
        Anonymizer::new(source_db, AnonymizerSettings::default()).with_target(target_db);
    anonymizer
        .table("users", |t| t.column("email").replace_with("anon_#row#@example.com"))
        .unwrap();

    anonymizer.run().await.unwrap();

    assert!(target
        .writes()
        .contains(&"INSERT INTO `users` SET `email` = 'anon_0@example.com', `id` = 3".to_string()));
}

#[tokio::test]
async fn test_rule_on_generated_column_rejected() {
    let source = Arc::new(MockDatabase::new("shop").on_query(
        "TABLE_NAME = 'users'",
        vec![Row::new().with("column_name", "email_domain")],
    ));
    let target = Arc::new(MockDatabase::new("shop_anon"));
    let source_db: Arc<dyn Database> = source.clone();
    let target_db: Arc<dyn Database> = target.clone();
    let mut anonymizer =
        Anonymizer::new(source_db, AnonymizerSettings::default()).with_target(target_db);
    anonymizer
        .table("users", |t| t.column("email_domain").replace_with("example.com"))
        .unwrap();

    let err = anonymizer.run().await.unwrap_err();
    assert!(matches!(err, VeilError::SchemaMismatch(_)));
    assert!(target.position("DROP TABLE").is_none());
}
