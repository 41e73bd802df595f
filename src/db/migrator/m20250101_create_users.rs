//! Creates the users table.
//!
//! `username` and `email` are `COLLATE NOCASE` with UNIQUE constraints:
//! uniqueness and equality comparisons against these columns are
//! case-insensitive at the store level while the inserted casing is kept.
//! Concurrent conflicting writes are therefore linearized by SQLite itself,
//! and the losing insert surfaces as a unique-constraint violation.

use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, Statement};

use super::MigrationTrait;

pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "m20250101_create_users"
    }

    async fn up(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let backend = txn.get_database_backend();

        txn.execute(Statement::from_string(
            backend,
            "CREATE TABLE users ( \
                id TEXT PRIMARY KEY, \
                username TEXT NOT NULL COLLATE NOCASE UNIQUE, \
                email TEXT NOT NULL COLLATE NOCASE UNIQUE, \
                password_hash TEXT NOT NULL, \
                created_at TEXT NOT NULL, \
                updated_at TEXT NOT NULL \
            )",
        ))
        .await?;

        Ok(())
    }
}
