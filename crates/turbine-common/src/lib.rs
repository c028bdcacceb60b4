//! Turbine Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, storage, and error handling for the turbine data workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used by the ingestion tool and the
//! query server:
//!
//! - **Types**: the canonical [`types::Measurement`] and the strict timestamp format
//! - **Store**: the [`store::MeasurementStore`] capability with PostgreSQL and in-memory backends
//! - **Logging**: `tracing` subscriber setup shared by both binaries
//! - **Error Handling**: common error and result types
//!
//! # Example
//!
//! ```no_run
//! use turbine_common::store::{MeasurementFilter, MeasurementStore, SortOrder};
//! use turbine_common::store::postgres::{PgMeasurementStore, PgStoreConfig};
//! use turbine_common::types::TimeWindow;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = PgMeasurementStore::connect(&PgStoreConfig::from_env()?).await?;
//!     let window = TimeWindow::parse("01.03.2021, 00:00", "01.03.2021, 00:10")?;
//!     let rows = store
//!         .find(&MeasurementFilter::new("Turbine1", window), SortOrder::Ascending)
//!         .await?;
//!     println!("{} measurements", rows.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TurbineError};
