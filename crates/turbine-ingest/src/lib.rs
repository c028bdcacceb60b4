//! Turbine Ingest Library
//!
//! Loads per-turbine measurement files into a [`MeasurementStore`].
//!
//! # Pipeline
//!
//! For every source reference, independently:
//!
//! 1. **Fetch**: download the URL or read the local file ([`source`])
//! 2. **Parse**: sniff the delimiter and split the two-row header ([`parser`])
//! 3. **Normalize**: canonical field names, strict timestamps, turbine id ([`normalizer`])
//! 4. **Store**: bulk insert the valid rows
//!
//! A failing source is recorded in the [`report::IngestionReport`] and never
//! stops the remaining sources.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use turbine_common::store::InMemoryStore;
//! use turbine_ingest::{pipeline::IngestionPipeline, source::{DefaultFetcher, SourceRef}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = DefaultFetcher::new(Duration::from_secs(30))?;
//!     let pipeline = IngestionPipeline::new(fetcher, Arc::new(InMemoryStore::new()));
//!     let sources: Vec<SourceRef> = vec!["data/Turbine1.csv".parse()?];
//!     let report = pipeline.ingest(&sources).await;
//!     print!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! [`MeasurementStore`]: turbine_common::store::MeasurementStore
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod source;

pub use error::IngestError;
pub use pipeline::IngestionPipeline;
pub use report::{FailureKind, IngestionReport, SourceOutcome};
