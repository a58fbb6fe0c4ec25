// server/src/cli/handlers.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lib::config::AppConfig;
use lib::database::Database;
use lib::services::auth::seed_admin;
use rest_api::{start_server, AppState};

/// Installs the global subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(path: Option<PathBuf>, port: Option<u16>) -> Result<AppConfig> {
    let mut config = AppConfig::load(path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = port {
        config.port = port;
    }
    Ok(config)
}

async fn open_database(config: &AppConfig) -> Result<Database> {
    let storage = config.storage();
    Database::new(&storage)
        .await
        .with_context(|| format!("Failed to open {} storage at {:?}", storage.engine_type, storage.data_directory))
}

async fn run_seed(db: &Database, config: &AppConfig) -> Result<()> {
    let admin = seed_admin(db, &config.admin_seed()).await.context("Failed to seed admin user")?;
    info!("Admin account ready: {} ({})", admin.username.as_deref().unwrap_or_default(), admin.id);
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}

pub async fn handle_serve(config_path: Option<PathBuf>, port: Option<u16>, seed: bool) -> Result<()> {
    let config = load_config(config_path, port)?;
    let db = Arc::new(open_database(&config).await?);
    if seed {
        run_seed(&db, &config).await?;
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let state = AppState::from_config(&config, db.clone())?;
    start_server(state, addr, shutdown_signal()).await?;

    db.flush().await.context("Failed to flush storage on shutdown")?;
    Ok(())
}

pub async fn handle_seed_admin(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path, None)?;
    let db = open_database(&config).await?;
    run_seed(&db, &config).await?;
    db.flush().await.context("Failed to flush storage")?;
    Ok(())
}
