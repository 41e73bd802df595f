use clap::Parser;

use cadastro::cli::{Cli, Commands};
use cadastro::db::{Migrator, Store};
use cadastro::{Config, run};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let worker_threads = config.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;

    runtime.block_on(async move {
        match cli.command {
            None | Some(Commands::Serve) => run(config).await,
            Some(Commands::Migrate { pending }) => migrate(&config, pending).await,
        }
    })
}

async fn migrate(config: &Config, preview_only: bool) -> anyhow::Result<()> {
    let store = Store::connect(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let migrator = Migrator::new();

    if preview_only {
        let pending = migrator.pending_migrations(&store.conn).await?;
        if pending.is_empty() {
            println!("No pending migrations");
        } else {
            for name in pending {
                println!("pending: {name}");
            }
        }
        return Ok(());
    }

    let applied = migrator.run_pending_migrations(&store.conn).await?;
    if applied.is_empty() {
        println!("Schema already up to date");
    } else {
        for name in applied {
            println!("applied: {name}");
        }
    }

    Ok(())
}
