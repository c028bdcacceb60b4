//! Ingestion report

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidSource,
    FetchFailed,
    ParseFailed,
    StoreFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidSource => "invalid_source",
            FailureKind::FetchFailed => "fetch_failed",
            FailureKind::ParseFailed => "parse_failed",
            FailureKind::StoreFailed => "store_failed",
        };
        f.write_str(name)
    }
}

/// Result of ingesting one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Ingested {
        source: String,
        turbine_id: String,
        inserted_count: u64,
        dropped_count: u64,
    },
    Failed {
        source: String,
        kind: FailureKind,
        detail: String,
        /// Rows the store kept before failing; non-zero only for partial inserts
        inserted_count: u64,
        /// Status code of a rejected download
        #[serde(default, skip_serializing_if = "Option::is_none")]
        http_status: Option<u16>,
    },
}

impl SourceOutcome {
    pub fn source(&self) -> &str {
        match self {
            SourceOutcome::Ingested { source, .. } | SourceOutcome::Failed { source, .. } => source,
        }
    }

    pub fn inserted_count(&self) -> u64 {
        match self {
            SourceOutcome::Ingested { inserted_count, .. }
            | SourceOutcome::Failed { inserted_count, .. } => *inserted_count,
        }
    }

    pub fn dropped_count(&self) -> u64 {
        match self {
            SourceOutcome::Ingested { dropped_count, .. } => *dropped_count,
            SourceOutcome::Failed { .. } => 0,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SourceOutcome::Failed { kind, .. } => Some(*kind),
            SourceOutcome::Ingested { .. } => None,
        }
    }
}

/// Per-source outcomes of one run, in input order, plus totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub per_source: Vec<SourceOutcome>,
    pub total_inserted: u64,
    pub total_dropped: u64,
    pub total_failed: usize,
}

impl IngestionReport {
    pub fn from_outcomes(per_source: Vec<SourceOutcome>) -> Self {
        Self {
            total_inserted: per_source.iter().map(SourceOutcome::inserted_count).sum(),
            total_dropped: per_source.iter().map(SourceOutcome::dropped_count).sum(),
            total_failed: per_source.iter().filter(|o| o.failure_kind().is_some()).count(),
            per_source,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.per_source.iter().filter(|o| o.failure_kind().is_some())
    }

    pub fn has_failures(&self) -> bool {
        self.total_failed > 0
    }
}

impl fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.per_source {
            match outcome {
                SourceOutcome::Ingested {
                    source,
                    turbine_id,
                    inserted_count,
                    dropped_count,
                } => writeln!(
                    f,
                    "OK      {source}  turbine={turbine_id} inserted={inserted_count} dropped={dropped_count}"
                )?,
                SourceOutcome::Failed {
                    source,
                    kind,
                    detail,
                    inserted_count,
                    ..
                } => writeln!(
                    f,
                    "FAILED  {source}  {kind}: {detail} (inserted={inserted_count})"
                )?,
            }
        }
        writeln!(
            f,
            "Total: {} sources, inserted={} dropped={} failed={}",
            self.per_source.len(),
            self.total_inserted,
            self.total_dropped,
            self.total_failed
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> IngestionReport {
        IngestionReport::from_outcomes(vec![
            SourceOutcome::Ingested {
                source: "Turbine1.csv".to_string(),
                turbine_id: "Turbine1".to_string(),
                inserted_count: 10,
                dropped_count: 2,
            },
            SourceOutcome::Failed {
                source: "https://example.com/Turbine2.csv".to_string(),
                kind: FailureKind::FetchFailed,
                detail: "fetch failed: HTTP status 404".to_string(),
                inserted_count: 0,
                http_status: Some(404),
            },
            SourceOutcome::Failed {
                source: "Turbine3.csv".to_string(),
                kind: FailureKind::StoreFailed,
                detail: "store failed".to_string(),
                inserted_count: 4,
                http_status: None,
            },
        ])
    }

    #[test]
    fn test_totals() {
        let report = sample();
        assert_eq!(report.total_inserted, 14);
        assert_eq!(report.total_dropped, 2);
        assert_eq!(report.total_failed, 2);
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_text_rendering() {
        let text = sample().to_string();
        assert!(text.contains("OK      Turbine1.csv  turbine=Turbine1 inserted=10 dropped=2"));
        assert!(text.contains("FAILED  https://example.com/Turbine2.csv  fetch_failed"));
        assert!(text.ends_with("Total: 3 sources, inserted=14 dropped=2 failed=2\n"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["per_source"][0]["status"], "ingested");
        assert_eq!(json["per_source"][1]["status"], "failed");
        assert_eq!(json["per_source"][1]["kind"], "fetch_failed");
        assert_eq!(json["per_source"][1]["http_status"], 404);
        assert!(json["per_source"][2].get("http_status").is_none());
        assert_eq!(json["total_failed"], 2);
    }
}
