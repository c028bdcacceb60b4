//! Turbine Server Library
//!
//! HTTP query service over stored turbine measurements.
//!
//! # Overview
//!
//! - **API Endpoints**: `GET /turbine/:turbine_id/data` and `GET /health`
//! - **Store**: any [`turbine_common::store::MeasurementStore`], PostgreSQL in production
//! - **Configuration**: Environment-based configuration management
//! - **Middleware**: CORS, compression and request logging
//!
//! # Architecture
//!
//! Features are vertical slices. A query module owns its input, output and
//! error types and a `handle` function that takes the store explicitly; the
//! route module is the only place where those errors become HTTP statuses.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use turbine_common::store::PgMeasurementStore;
//! use turbine_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = PgMeasurementStore::connect(&config.database).await?;
//!     api::serve(config, Arc::new(store)).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
