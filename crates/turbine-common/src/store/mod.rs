//! Measurement store capability
//!
//! The store is the only persistence seam in the workspace. It offers exactly
//! two data operations: a bulk insert and a filtered, sorted find. Callers
//! construct one store at process start and pass it around as
//! `Arc<dyn MeasurementStore>`; there is no global handle.
//!
//! Backends:
//! - [`postgres::PgMeasurementStore`]: the production backend on SQLx
//! - [`memory::InMemoryStore`]: a process-local backend for tests and local runs
//!
//! Re-inserting the same measurements stores them again. There is no
//! deduplication on `(turbine_id, timestamp)` unless a uniqueness constraint is
//! added to the table externally.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Measurement, TimeWindow};

pub use memory::InMemoryStore;
pub use postgres::{PgMeasurementStore, PgStoreConfig};

/// Selects the measurements of one turbine inside an inclusive window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementFilter {
    pub turbine_id: String,
    pub window: TimeWindow,
}

impl MeasurementFilter {
    pub fn new(turbine_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            turbine_id: turbine_id.into(),
            window,
        }
    }

    pub fn matches(&self, measurement: &Measurement) -> bool {
        measurement.turbine_id == self.turbine_id && self.window.contains(&measurement.timestamp)
    }
}

/// Ordering of `find` results by timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Some chunks of a bulk insert were committed before a later one failed
    #[error("Store accepted {inserted} records before failing: {source}")]
    PartialInsert {
        inserted: u64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Records persisted by the failed call
    pub fn inserted(&self) -> u64 {
        match self {
            StoreError::PartialInsert { inserted, .. } => *inserted,
            _ => 0,
        }
    }
}

/// Persistence capability for measurements
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Insert all measurements, returning how many were persisted.
    ///
    /// Each call is one unit as far as callers are concerned, but a backend
    /// that writes in chunks may accept a prefix of the batch; that case is
    /// reported as [`StoreError::PartialInsert`].
    async fn insert_many(&self, measurements: &[Measurement]) -> Result<u64, StoreError>;

    /// Measurements matching `filter`, ordered by timestamp.
    ///
    /// Ties keep insertion order. Storage identifiers are never returned.
    async fn find(
        &self,
        filter: &MeasurementFilter,
        sort: SortOrder,
    ) -> Result<Vec<Measurement>, StoreError>;

    /// Cheap reachability probe
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
