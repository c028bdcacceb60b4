//! Record normalization
//!
//! Source files carry a two-row header: the first row names the quantity,
//! the second its unit (often blank). Each column gets a canonical name
//! `quantity(unit)`, or just `quantity` when the unit is blank, so the
//! interesting columns come out as `Dat/Zeit`, `Wind(m/s)` and `Leistung(kW)`.
//!
//! Wind speed and power are kept as the exact source text. The timestamp is
//! the only value that is interpreted, and it must match `DD.MM.YYYY, HH:MM`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use turbine_common::types::{
    parse_timestamp, Measurement, POWER_FIELD, TIMESTAMP_FIELD, WIND_SPEED_FIELD,
};

/// One column of the two-row header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderColumn {
    pub name: String,
    pub unit: String,
}

impl HeaderColumn {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }

    pub fn canonical_name(&self) -> String {
        canonical_field_name(&self.name, &self.unit)
    }
}

/// `name(unit)` with both parts trimmed, or `name` alone for a blank unit.
pub fn canonical_field_name(name: &str, unit: &str) -> String {
    let name = name.trim();
    let unit = unit.trim();
    if unit.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, unit)
    }
}

/// Turbine id for a source: the final path segment up to its first `.`.
///
/// Returns `None` when that leaves nothing, e.g. for `.csv` or a trailing `/`.
pub fn turbine_id_from_label(label: &str) -> Option<String> {
    let file_name = label.rsplit(['/', '\\']).next().unwrap_or(label);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("malformed timestamp '{value}'")]
    MalformedTimestamp { value: String },

    #[error("row has no value for column '{column}'")]
    MissingField { column: String },

    #[error("header has no '{column}' column")]
    MissingColumn { column: String },

    #[error("cannot derive a turbine id from '{label}'")]
    InvalidSourceLabel { label: String },
}

/// Column layout and turbine id of one source, resolved once and applied to
/// every row.
#[derive(Debug, Clone)]
pub struct Normalizer {
    turbine_id: String,
    field_names: Vec<String>,
    timestamp_idx: usize,
    wind_speed_idx: usize,
    power_idx: usize,
}

impl Normalizer {
    pub fn new(headers: &[HeaderColumn], source_label: &str) -> Result<Self, NormalizationError> {
        let turbine_id = turbine_id_from_label(source_label).ok_or_else(|| {
            NormalizationError::InvalidSourceLabel {
                label: source_label.to_string(),
            }
        })?;

        let field_names: Vec<String> = headers.iter().map(HeaderColumn::canonical_name).collect();
        let position = |column: &str| {
            field_names
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| NormalizationError::MissingColumn {
                    column: column.to_string(),
                })
        };

        Ok(Self {
            timestamp_idx: position(TIMESTAMP_FIELD)?,
            wind_speed_idx: position(WIND_SPEED_FIELD)?,
            power_idx: position(POWER_FIELD)?,
            turbine_id,
            field_names,
        })
    }

    pub fn turbine_id(&self) -> &str {
        &self.turbine_id
    }

    /// Canonical names in column order
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn normalize(&self, row: &[String]) -> Result<Measurement, NormalizationError> {
        let timestamp_text = self.field(row, self.timestamp_idx)?;
        let timestamp = parse_timestamp(timestamp_text)
            .map_err(|e| NormalizationError::MalformedTimestamp { value: e.value })?;

        let extra: BTreeMap<String, String> = self
            .field_names
            .iter()
            .zip(row)
            .enumerate()
            .filter(|(idx, (name, _))| !name.is_empty() && !self.is_core_column(*idx))
            .map(|(_, (name, value))| (name.clone(), value.clone()))
            .collect();

        Ok(Measurement {
            turbine_id: self.turbine_id.clone(),
            timestamp,
            wind_speed: self.field(row, self.wind_speed_idx)?.to_string(),
            power: self.field(row, self.power_idx)?.to_string(),
            extra,
        })
    }

    fn is_core_column(&self, idx: usize) -> bool {
        idx == self.timestamp_idx || idx == self.wind_speed_idx || idx == self.power_idx
    }

    fn field<'r>(&self, row: &'r [String], idx: usize) -> Result<&'r str, NormalizationError> {
        row.get(idx)
            .map(String::as_str)
            .ok_or_else(|| NormalizationError::MissingField {
                column: self.field_names[idx].clone(),
            })
    }
}

/// Normalize a single row without reusing a [`Normalizer`].
pub fn normalize(
    row: &[String],
    headers: &[HeaderColumn],
    source_label: &str,
) -> Result<Measurement, NormalizationError> {
    Normalizer::new(headers, source_label)?.normalize(row)
}
