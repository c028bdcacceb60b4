//! Turbine Ingest - load measurement files into the store

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{sync::Arc, time::Duration};
use tracing::info;
use turbine_common::{
    logging::{init_logging, LogConfig, LogLevel},
    store::{PgMeasurementStore, PgStoreConfig},
};
use turbine_ingest::{
    pipeline::{IngestionPipeline, DEFAULT_CONCURRENCY},
    source::{DefaultFetcher, SourceRef, DEFAULT_FETCH_TIMEOUT_SECS},
};

#[derive(Parser, Debug)]
#[command(name = "turbine-ingest")]
#[command(author, version, about = "Load turbine measurement files into the measurement store")]
struct Cli {
    /// Source files to ingest, as URLs or local paths. The file name up to
    /// its first '.' becomes the turbine id.
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<SourceRef>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Measurement table (overrides DATABASE_TABLE)
    #[arg(long)]
    table: Option<String>,

    /// Number of sources processed at once
    #[arg(short = 'j', long, env = "INGEST_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Timeout for each download, in seconds
    #[arg(long, env = "INGEST_FETCH_TIMEOUT", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,

    /// Report format written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Do not create the measurement table and index
    #[arg(long)]
    skip_provision: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // stdout carries the report, so logs go to stderr
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("turbine-ingest")
        .filter_directives("sqlx=warn,reqwest=info")
        .console_stderr(true)
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut store_config = PgStoreConfig::from_env()?;
    if let Some(url) = cli.database_url {
        store_config.url = url;
    }
    if let Some(table) = cli.table {
        store_config.table = table;
    }
    store_config.validate()?;

    // the only fatal failure: without a store there is nothing to ingest into
    let store = PgMeasurementStore::connect(&store_config)
        .await
        .context("Failed to connect to the measurement store")?;

    if !cli.skip_provision {
        store
            .provision()
            .await
            .context("Failed to provision the measurement table")?;
    }

    let fetcher = DefaultFetcher::new(Duration::from_secs(cli.fetch_timeout_secs))?;
    let pipeline =
        IngestionPipeline::new(fetcher, Arc::new(store.clone())).with_concurrency(cli.concurrency);

    let report = pipeline.ingest(&cli.sources).await;

    match cli.format {
        ReportFormat::Text => print!("{}", report),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    store.close().await;
    info!("Ingestion complete");
    Ok(())
}
