//! In-memory store backend

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MeasurementFilter, MeasurementStore, SortOrder, StoreError};
use crate::types::Measurement;

/// Keeps measurements in insertion order inside the process
#[derive(Debug, Default)]
pub struct InMemoryStore {
    measurements: RwLock<Vec<Measurement>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measurements(measurements: Vec<Measurement>) -> Self {
        Self {
            measurements: RwLock::new(measurements),
        }
    }

    pub async fn len(&self) -> usize {
        self.measurements.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.measurements.read().await.is_empty()
    }

    /// Copy of everything stored, in insertion order
    pub async fn snapshot(&self) -> Vec<Measurement> {
        self.measurements.read().await.clone()
    }
}

#[async_trait]
impl MeasurementStore for InMemoryStore {
    async fn insert_many(&self, measurements: &[Measurement]) -> Result<u64, StoreError> {
        let mut stored = self.measurements.write().await;
        stored.extend_from_slice(measurements);
        Ok(measurements.len() as u64)
    }

    async fn find(
        &self,
        filter: &MeasurementFilter,
        sort: SortOrder,
    ) -> Result<Vec<Measurement>, StoreError> {
        let stored = self.measurements.read().await;
        let mut matches: Vec<Measurement> =
            stored.iter().filter(|m| filter.matches(m)).cloned().collect();

        // stable sorts keep insertion order for equal timestamps
        match sort {
            SortOrder::Ascending => matches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Descending => matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }

        Ok(matches)
    }
}
