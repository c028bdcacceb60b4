//! Domain types shared by ingestion and querying

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// `chrono` pattern for `DD.MM.YYYY, HH:MM`, used by source files and query parameters.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y, %H:%M";

/// Canonical name of the timestamp column in source files.
pub const TIMESTAMP_FIELD: &str = "Dat/Zeit";

/// Canonical name of the wind speed column in source files.
pub const WIND_SPEED_FIELD: &str = "Wind(m/s)";

/// Canonical name of the power output column in source files.
pub const POWER_FIELD: &str = "Leistung(kW)";

/// Text that does not match [`TIMESTAMP_FORMAT`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp '{value}', expected DD.MM.YYYY, HH:MM")]
pub struct TimestampError {
    pub value: String,
}

/// Parse `DD.MM.YYYY, HH:MM` into a naive instant.
///
/// The whole input must be consumed; trailing seconds or other formats such
/// as ISO dates are rejected rather than guessed.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| TimestampError {
        value: value.to_string(),
    })
}

/// One timestamped reading of wind speed and power output for a turbine.
///
/// Wind speed and power are kept as the exact source text; no unit conversion
/// or numeric validation happens anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub turbine_id: String,
    pub timestamp: NaiveDateTime,
    pub wind_speed: String,
    pub power: String,
    /// Supplementary source columns keyed by canonical field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Inclusive time range `[start, end]`.
///
/// `start <= end` is not enforced; an inverted window matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Parse both bounds with [`parse_timestamp`]
    pub fn parse(start: &str, end: &str) -> Result<Self, TimestampError> {
        Ok(Self::new(parse_timestamp(start)?, parse_timestamp(end)?))
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        self.start <= *instant && *instant <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}
