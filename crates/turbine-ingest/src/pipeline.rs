//! Ingestion pipeline
//!
//! Each source is fetched, parsed, normalized and bulk inserted on its own.
//! Any failure is turned into a [`SourceOutcome::Failed`] entry for that
//! source; the run always continues with the next one. There is no
//! transaction across sources, and ingesting the same file twice stores its
//! rows twice.

use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use turbine_common::{store::MeasurementStore, types::Measurement};

use crate::{
    error::IngestError,
    normalizer::{turbine_id_from_label, Normalizer},
    parser::{parse_table, RawRow},
    report::{IngestionReport, SourceOutcome},
    source::{SourceFetcher, SourceRef},
};

/// Sources processed at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 1;

pub struct IngestionPipeline<F> {
    fetcher: F,
    store: Arc<dyn MeasurementStore>,
    concurrency: usize,
}

impl<F: SourceFetcher> IngestionPipeline<F> {
    pub fn new(fetcher: F, store: Arc<dyn MeasurementStore>) -> Self {
        Self {
            fetcher,
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Process up to `concurrency` sources at a time. Report order still
    /// follows input order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn ingest(&self, sources: &[SourceRef]) -> IngestionReport {
        info!(sources = sources.len(), concurrency = self.concurrency, "Starting ingestion");

        let outcomes = stream::iter(sources)
            .map(|source| self.ingest_source(source))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = IngestionReport::from_outcomes(outcomes);
        info!(
            inserted = report.total_inserted,
            dropped = report.total_dropped,
            failed = report.total_failed,
            "Ingestion finished"
        );
        report
    }

    #[tracing::instrument(skip(self, source), fields(source = %source))]
    async fn ingest_source(&self, source: &SourceRef) -> SourceOutcome {
        match self.try_ingest_source(source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Source failed");
                SourceOutcome::Failed {
                    source: source.to_string(),
                    kind: e.kind(),
                    detail: e.to_string(),
                    inserted_count: e.inserted(),
                    http_status: e.http_status(),
                }
            },
        }
    }

    async fn try_ingest_source(&self, source: &SourceRef) -> Result<SourceOutcome, IngestError> {
        let label = source.file_label();
        // reject unusable names before spending a download on them
        if turbine_id_from_label(&label).is_none() {
            return Err(IngestError::InvalidSource(format!(
                "cannot derive a turbine id from '{}'",
                label
            )));
        }

        let bytes = self.fetcher.fetch(source).await?;
        debug!(bytes = bytes.len(), "Fetched source");

        let table = parse_table(&bytes)?;
        let normalizer = Normalizer::new(&table.headers, &label)?;
        let (measurements, dropped) = normalize_rows(&normalizer, &table.rows);

        if dropped > 0 {
            warn!(
                turbine_id = normalizer.turbine_id(),
                dropped,
                "Rows dropped during normalization"
            );
        }

        let inserted = if measurements.is_empty() {
            0
        } else {
            self.store.insert_many(&measurements).await?
        };

        info!(
            turbine_id = normalizer.turbine_id(),
            inserted,
            dropped,
            "Source ingested"
        );

        Ok(SourceOutcome::Ingested {
            source: source.to_string(),
            turbine_id: normalizer.turbine_id().to_string(),
            inserted_count: inserted,
            dropped_count: dropped,
        })
    }
}

fn normalize_rows(normalizer: &Normalizer, rows: &[RawRow]) -> (Vec<Measurement>, u64) {
    let mut measurements = Vec::with_capacity(rows.len());
    let mut dropped = 0u64;

    for row in rows {
        match normalizer.normalize(&row.fields) {
            Ok(measurement) => measurements.push(measurement),
            Err(e) => {
                debug!(line = row.line, error = %e, "Dropping row");
                dropped += 1;
            },
        }
    }

    (measurements, dropped)
}
