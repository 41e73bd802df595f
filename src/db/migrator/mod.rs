//! Forward-only schema migration runner.
//!
//! Migrations are an explicit registry of [`MigrationTrait`] objects with
//! strictly orderable names; applied ones are recorded in the
//! `schema_migrations` table. Pending = known but not recorded, applied in
//! ascending name order. Each migration body and its bookkeeping row commit
//! in a single transaction, so a crash mid-run leaves a consistent prefix
//! applied and the tail still pending. Re-running only applies the tail;
//! there is no rollback.

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, Statement, TransactionTrait,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

mod m20250101_create_users;
mod m20250412_add_user_features;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration bookkeeping failed: {0}")]
    Bookkeeping(#[from] DbErr),

    #[error("migration {name} failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: DbErr,
    },
}

/// A single forward-only unit of schema change.
#[async_trait::async_trait]
pub trait MigrationTrait: Send + Sync {
    /// Sortable identifier, unique per migration (`mYYYYMMDD_description`).
    fn name(&self) -> &'static str;

    async fn up(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;
}

/// Registry of known migrations. Constructed once at process start and
/// passed to callers; there is no global migration state.
pub struct Migrator {
    migrations: Vec<Box<dyn MigrationTrait>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Migrator {
    /// The full registry this binary knows about.
    #[must_use]
    pub fn new() -> Self {
        Self::with_migrations(vec![
            Box::new(m20250101_create_users::Migration),
            Box::new(m20250412_add_user_features::Migration),
        ])
    }

    /// Build a registry from an explicit list. Order of the list does not
    /// matter; application order is always ascending by name.
    #[must_use]
    pub fn with_migrations(mut migrations: Vec<Box<dyn MigrationTrait>>) -> Self {
        migrations.sort_by_key(|m| m.name());
        Self { migrations }
    }

    /// Names of migrations that are known but not yet recorded as applied,
    /// in the order they would run. Does not apply anything.
    pub async fn pending_migrations(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<Vec<&'static str>, MigrationError> {
        let applied = self.applied_identifiers(conn).await?;

        Ok(self
            .migrations
            .iter()
            .map(|m| m.name())
            .filter(|name| !applied.contains(*name))
            .collect())
    }

    /// Apply every pending migration in ascending name order, recording each
    /// one immediately after it succeeds. Stops at the first failure, leaving
    /// later migrations pending; already-applied migrations are never
    /// re-executed.
    pub async fn run_pending_migrations(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<Vec<&'static str>, MigrationError> {
        let pending = self.pending_migrations(conn).await?;
        let mut applied = Vec::with_capacity(pending.len());

        for migration in self.migrations.iter() {
            let name = migration.name();
            if !pending.contains(&name) {
                continue;
            }

            let txn = conn.begin().await?;

            migration
                .up(&txn)
                .await
                .map_err(|source| MigrationError::Failed { name, source })?;

            // Recorded inside the same transaction as the body: a crash
            // between the two cannot mark an unapplied migration as applied.
            let backend = txn.get_database_backend();
            txn.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO schema_migrations (identifier, applied_at) VALUES (?, ?)",
                [name.into(), Utc::now().to_rfc3339().into()],
            ))
            .await?;

            txn.commit().await?;

            info!("Applied migration {name}");
            applied.push(name);
        }

        Ok(applied)
    }

    async fn applied_identifiers(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<HashSet<String>, MigrationError> {
        let backend = conn.get_database_backend();

        conn.execute(Statement::from_string(
            backend,
            "CREATE TABLE IF NOT EXISTS schema_migrations ( \
                identifier TEXT PRIMARY KEY, \
                applied_at TEXT NOT NULL \
            )",
        ))
        .await?;

        let rows = conn
            .query_all(Statement::from_string(
                backend,
                "SELECT identifier FROM schema_migrations",
            ))
            .await?;

        let mut applied = HashSet::with_capacity(rows.len());
        for row in rows {
            applied.insert(row.try_get::<String>("", "identifier")?);
        }

        Ok(applied)
    }
}
