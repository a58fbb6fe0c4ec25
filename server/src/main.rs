// server/src/main.rs

// Entry point for the clinic backend. Argument parsing and dispatch live in
// the `cli` module.

use anyhow::Result;
use clinic_server::cli::start_cli;

#[tokio::main]
async fn main() -> Result<()> {
    start_cli().await
}
