//! Turbine Server - Main entry point

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use turbine_common::{
    logging::{init_logging, LogConfig},
    store::PgMeasurementStore,
};

use turbine_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("turbine-server")
        .filter_directives("turbine_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Turbine Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = PgMeasurementStore::connect(&config.database)
        .await
        .context("Failed to connect to the measurement store")?;
    info!(table = store.table(), "Database connection pool established");

    store
        .provision()
        .await
        .context("Failed to provision the measurement table")?;

    api::serve(config, Arc::new(store.clone())).await?;

    store.close().await;
    Ok(())
}
