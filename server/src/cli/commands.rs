// server/src/cli/commands.rs

// Command-line arguments and subcommands for the clinic server, defined with
// the `clap` derive API.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(version = "0.1.0")]
#[command(about = "Clinic appointments backend")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Configuration file; defaults to clinic_config.yaml when present
        #[arg(long, short = 'c', value_name = "PATH")]
        config: Option<PathBuf>,
        /// Overrides the configured port
        #[arg(long, short = 'p', value_name = "PORT")]
        port: Option<u16>,
        /// Create or refresh the configured admin account before serving
        #[arg(long)]
        seed_admin: bool,
    },
    /// Create or refresh the configured admin account and exit
    SeedAdmin {
        #[arg(long, short = 'c', value_name = "PATH")]
        config: Option<PathBuf>,
    },
}
