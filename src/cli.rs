//! Command-line interface.

use clap::{Parser, Subcommand};

/// Cadastro - user account service
#[derive(Parser)]
#[command(name = "cadastro")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Apply pending schema migrations and exit
    Migrate {
        /// Only list pending migrations; apply nothing
        #[arg(long)]
        pending: bool,
    },
}
