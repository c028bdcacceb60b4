//! Per-source ingestion errors

use thiserror::Error;
use turbine_common::store::StoreError;

use crate::{
    normalizer::NormalizationError, parser::ParseError, report::FailureKind, source::FetchError,
};

/// Why a single source could not be ingested. Never fatal to other sources.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    InvalidSource(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("unusable header: {0}")]
    Header(NormalizationError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl From<NormalizationError> for IngestError {
    fn from(err: NormalizationError) -> Self {
        match err {
            NormalizationError::InvalidSourceLabel { .. } => IngestError::InvalidSource(err.to_string()),
            other => IngestError::Header(other),
        }
    }
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::InvalidSource(_) => FailureKind::InvalidSource,
            IngestError::Fetch(_) => FailureKind::FetchFailed,
            IngestError::Parse(_) | IngestError::Header(_) => FailureKind::ParseFailed,
            IngestError::Store(_) => FailureKind::StoreFailed,
        }
    }

    /// Status code when the source host answered with an error
    pub fn http_status(&self) -> Option<u16> {
        match self {
            IngestError::Fetch(e) => e.status(),
            _ => None,
        }
    }

    /// Records the store kept despite the failure
    pub fn inserted(&self) -> u64 {
        match self {
            IngestError::Store(e) => e.inserted(),
            _ => 0,
        }
    }
}
