//! Adds the `features` capability-tag column to users.
//!
//! Stored as a JSON array of strings. Existing rows get an empty set;
//! accounts created after this migration start with the
//! `read:activation_token` capability assigned by the repository.

use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, Statement};

use super::MigrationTrait;

pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "m20250412_add_user_features"
    }

    async fn up(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let backend = txn.get_database_backend();

        txn.execute(Statement::from_string(
            backend,
            "ALTER TABLE users ADD COLUMN features TEXT NOT NULL DEFAULT '[]'",
        ))
        .await?;

        Ok(())
    }
}
