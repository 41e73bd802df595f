use anyhow::Result;

use crate::config::Config;
use crate::db::{Migrator, Store};

/// Everything the request path needs: the loaded config and the store,
/// already migrated by the registry built at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,
    pub store: Store,
}

impl SharedState {
    pub async fn new(config: Config) -> Result<Self> {
        let migrator = Migrator::new();
        let store = Store::with_pool_options(
            &config.general.database_url,
            &migrator,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self { config, store })
    }
}
