// server/src/cli/mod.rs

pub mod commands;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use commands::{CliArgs, Commands};

/// Parses the command line, prepares logging and the environment, and runs
/// the requested command.
pub async fn start_cli() -> Result<()> {
    // A missing .env file is fine; real deployments use the environment.
    dotenv::dotenv().ok();
    handlers::init_tracing();

    let args = CliArgs::parse();
    match args.command {
        Commands::Serve { config, port, seed_admin } => handlers::handle_serve(config, port, seed_admin).await,
        Commands::SeedAdmin { config } => handlers::handle_seed_admin(config).await,
    }
}
