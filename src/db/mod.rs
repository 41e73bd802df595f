use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use migrator::{MigrationError, Migrator};
pub use repositories::user::{User, UserError, UserPatch, UserRepository};

use crate::config::SecurityConfig;

/// Owns the connection pool. Every statement the service runs goes through
/// a repository handed out by this type.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    /// Connect and bring the schema up to date with the given registry.
    pub async fn new(db_url: &str, migrator: &Migrator) -> Result<Self> {
        Self::with_pool_options(db_url, migrator, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        migrator: &Migrator,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let store = Self::connect(db_url, max_connections, min_connections).await?;

        let applied = migrator.run_pending_migrations(&store.conn).await?;

        info!(
            "Database connected, {} migration(s) applied",
            applied.len()
        );

        Ok(store)
    }

    /// Connect without touching the schema. Used by the `migrate` CLI
    /// commands, which drive the migrator themselves.
    pub async fn connect(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        // Each pooled connection to an in-memory SQLite gets its own
        // database, so the pool must stay at a single connection there.
        let max_connections = if db_url.contains(":memory:") {
            1
        } else {
            ensure_database_file(db_url).await?;
            max_connections
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections.min(max_connections))
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// SQLite library version, reported by the status endpoint.
    pub async fn database_version(&self) -> Result<String> {
        let backend = self.conn.get_database_backend();
        let row = self
            .conn
            .query_one(Statement::from_string(
                backend,
                "SELECT sqlite_version() AS version".to_string(),
            ))
            .await?
            .ok_or_else(|| anyhow::anyhow!("sqlite_version() returned no row"))?;

        Ok(row.try_get::<String>("", "version")?)
    }

    pub fn user_repo(&self, security: &SecurityConfig) -> UserRepository {
        UserRepository::new(self.conn.clone(), security.clone())
    }
}

async fn ensure_database_file(db_url: &str) -> Result<()> {
    let path_str = db_url.trim_start_matches("sqlite:");
    if let Some(parent) = Path::new(path_str).parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    if !Path::new(path_str).exists() {
        std::fs::File::create(path_str)?;
    }
    Ok(())
}
