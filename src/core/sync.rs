//! Consistency synchronizer
//!
//! While a table is anonymized in place, columns with sync rules carry an
//! `AFTER UPDATE` trigger that rewrites every dependent row still holding the
//! previous value. Triggers live only for the duration of the table's
//! processing: [`Synchronizer::install`] runs before the first UPDATE and
//! [`Synchronizer::teardown`] runs after the last one, whatever the outcome.

use crate::adapters::database::Database;
use crate::blueprint::{Blueprint, SyncRule};
use crate::domain::{quote_ident, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Longest identifier MySQL accepts for a trigger
pub const MAX_TRIGGER_NAME_LEN: usize = 64;

const DIGEST_HEX_LEN: usize = 8;

/// Deterministic trigger name for a synchronized column
///
/// Names longer than the server limit are shortened and suffixed with a
/// digest of the full name so two long names never collide.
pub fn trigger_name(prefix: &str, table: &str, column: &str) -> String {
    let full = format!("{prefix}_{table}_{column}");
    if full.chars().count() <= MAX_TRIGGER_NAME_LEN {
        return full;
    }

    let digest: String = Sha256::digest(full.as_bytes())
        .iter()
        .take(DIGEST_HEX_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect();
    let head: String = full
        .chars()
        .take(MAX_TRIGGER_NAME_LEN - DIGEST_HEX_LEN - 1)
        .collect();
    format!("{head}_{digest}")
}

/// `CREATE TRIGGER` statement propagating `rule.column` of `table`
pub fn create_trigger_sql(name: &str, table: &str, rule: &SyncRule) -> String {
    let column = quote_ident(&rule.column);
    let mut sql = format!(
        "CREATE TRIGGER {} AFTER UPDATE ON {} FOR EACH ROW BEGIN IF NOT (OLD.{column} <=> NEW.{column}) THEN",
        quote_ident(name),
        quote_ident(table),
    );
    for target in &rule.targets {
        let target_column = quote_ident(&target.column);
        sql.push_str(&format!(
            " UPDATE {} SET {target_column} = NEW.{column} WHERE {target_column} = OLD.{column};",
            quote_ident(&target.table),
        ));
    }
    sql.push_str(" END IF; END");
    sql
}

pub fn drop_trigger_sql(name: &str) -> String {
    format!("DROP TRIGGER IF EXISTS {}", quote_ident(name))
}

/// Installs and removes the sync triggers of one blueprint
pub struct Synchronizer<'a> {
    db: &'a dyn Database,
    prefix: &'a str,
}

impl<'a> Synchronizer<'a> {
    pub fn new(db: &'a dyn Database, prefix: &'a str) -> Self {
        Self { db, prefix }
    }

    /// Creates one trigger per sync rule and records it on the blueprint
    ///
    /// A trigger left behind by an aborted run is dropped first. When a
    /// creation fails, the triggers this call already created are removed
    /// before the error is returned; any that cannot be dropped stay recorded.
    ///
    /// # Errors
    ///
    /// Returns the server error of the failing `CREATE TRIGGER`.
    pub async fn install(&self, blueprint: &mut Blueprint) -> Result<()> {
        if blueprint.sync_rules.is_empty() {
            return Ok(());
        }

        for rule in &blueprint.sync_rules {
            let name = trigger_name(self.prefix, &blueprint.table, &rule.column);
            let created = async {
                self.db.execute_raw(&drop_trigger_sql(&name)).await?;
                self.db
                    .execute_raw(&create_trigger_sql(&name, &blueprint.table, rule))
                    .await
            }
            .await;

            if let Err(e) = created {
                warn!(
                    table = %blueprint.table,
                    trigger = %name,
                    error = %e,
                    "Failed to install sync trigger, removing the ones already installed"
                );
                let mut kept = Vec::new();
                for installed in blueprint.active_triggers.drain(..).rev() {
                    if let Err(drop_err) = self.db.execute_raw(&drop_trigger_sql(&installed)).await
                    {
                        warn!(trigger = %installed, error = %drop_err, "Failed to drop sync trigger");
                        kept.push(installed);
                    }
                }
                kept.reverse();
                blueprint.active_triggers = kept;
                return Err(e);
            }

            debug!(table = %blueprint.table, trigger = %name, "Installed sync trigger");
            blueprint.active_triggers.push(name);
        }

        info!(
            table = %blueprint.table,
            triggers = blueprint.active_triggers.len(),
            "Sync triggers installed"
        );
        Ok(())
    }

    /// Drops every trigger recorded on the blueprint
    ///
    /// All drops are attempted; triggers that could not be dropped stay
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns the first drop failure.
    pub async fn teardown(&self, blueprint: &mut Blueprint) -> Result<()> {
        let mut first_error = None;
        let mut remaining = Vec::new();

        for name in blueprint.active_triggers.drain(..).rev() {
            match self.db.execute_raw(&drop_trigger_sql(&name)).await {
                Ok(()) => debug!(trigger = %name, "Removed sync trigger"),
                Err(e) => {
                    warn!(trigger = %name, error = %e, "Failed to remove sync trigger");
                    remaining.push(name);
                    first_error.get_or_insert(e);
                }
            }
        }

        remaining.reverse();
        blueprint.active_triggers = remaining;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::SyncTarget;

    #[test]
    fn test_trigger_name_short() {
        assert_eq!(
            trigger_name("veil_sync", "users", "email"),
            "veil_sync_users_email"
        );
    }

    #[test]
    fn test_trigger_name_truncated_and_distinct() {
        let long_table = "t".repeat(60);
        let a = trigger_name("veil_sync", &long_table, "email_address");
        let b = trigger_name("veil_sync", &long_table, "email_backup");
        assert_eq!(a.chars().count(), MAX_TRIGGER_NAME_LEN);
        assert_eq!(b.chars().count(), MAX_TRIGGER_NAME_LEN);
        assert_ne!(a, b);
        assert_eq!(a, trigger_name("veil_sync", &long_table, "email_address"));
    }

    #[test]
    fn test_create_trigger_sql() {
        let rule = SyncRule {
            column: "email".to_string(),
            targets: vec![
                SyncTarget::new("orders", "customer_email"),
                SyncTarget::new("invoices", "email"),
            ],
        };
        let sql = create_trigger_sql("veil_sync_users_email", "users", &rule);
        assert_eq!(
            sql,
            "CREATE TRIGGER `veil_sync_users_email` AFTER UPDATE ON `users` FOR EACH ROW BEGIN \
             IF NOT (OLD.`email` <=> NEW.`email`) THEN \
             UPDATE `orders` SET `customer_email` = NEW.`email` WHERE `customer_email` = OLD.`email`; \
             UPDATE `invoices` SET `email` = NEW.`email` WHERE `email` = OLD.`email`; \
             END IF; END"
        );
    }

    #[test]
    fn test_drop_trigger_sql() {
        assert_eq!(drop_trigger_sql("x"), "DROP TRIGGER IF EXISTS `x`");
    }
}
