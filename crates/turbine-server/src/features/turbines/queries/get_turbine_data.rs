use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turbine_common::{
    store::{MeasurementFilter, MeasurementStore, SortOrder, StoreError},
    types::{Measurement, TimeWindow},
};

/// Measurements of one turbine between two `DD.MM.YYYY, HH:MM` instants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTurbineDataQuery {
    pub turbine_id: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurbineResponse {
    pub turbine_id: String,
    pub data: Vec<TurbineData>,
}

/// One reading as returned to clients. All values are text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurbineData {
    /// `YYYY-MM-DD HH:MM:SS`
    pub datetime: String,
    pub wind_speed: String,
    pub power: String,
}

impl From<Measurement> for TurbineData {
    fn from(measurement: Measurement) -> Self {
        Self {
            datetime: measurement.timestamp.to_string(),
            wind_speed: measurement.wind_speed,
            power: measurement.power,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetTurbineDataError {
    #[error("Invalid date format. Use DD.MM.YYYY, HH:MM")]
    InvalidTimeFormat,
    #[error("No data found for the turbine ID and time range.")]
    NotFound,
    #[error("{0}")]
    StoreFailed(#[from] StoreError),
}

impl GetTurbineDataQuery {
    pub fn validate(&self) -> Result<TimeWindow, GetTurbineDataError> {
        TimeWindow::parse(&self.start_time, &self.end_time)
            .map_err(|_| GetTurbineDataError::InvalidTimeFormat)
    }
}

#[tracing::instrument(skip(store), fields(turbine_id = %query.turbine_id))]
pub async fn handle(
    store: Arc<dyn MeasurementStore>,
    query: GetTurbineDataQuery,
) -> Result<TurbineResponse, GetTurbineDataError> {
    let window = query.validate()?;

    let filter = MeasurementFilter::new(query.turbine_id.clone(), window);
    let measurements = store.find(&filter, SortOrder::Ascending).await?;

    if measurements.is_empty() {
        return Err(GetTurbineDataError::NotFound);
    }

    tracing::debug!(count = measurements.len(), "Measurements found");

    Ok(TurbineResponse {
        turbine_id: query.turbine_id,
        data: measurements.into_iter().map(TurbineData::from).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use turbine_common::{store::InMemoryStore, types::parse_timestamp};

    fn measurement(turbine_id: &str, at: &str, wind: &str, power: &str) -> Measurement {
        Measurement {
            turbine_id: turbine_id.to_string(),
            timestamp: parse_timestamp(at).unwrap(),
            wind_speed: wind.to_string(),
            power: power.to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn query(turbine_id: &str, start: &str, end: &str) -> GetTurbineDataQuery {
        GetTurbineDataQuery {
            turbine_id: turbine_id.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn store() -> Arc<dyn MeasurementStore> {
        Arc::new(InMemoryStore::with_measurements(vec![
            measurement("Turbine1", "05.03.2021, 14:00", "4,9", "90,1"),
            measurement("Turbine1", "05.03.2021, 13:40", "5,3", "100,0"),
            measurement("Turbine2", "05.03.2021, 13:50", "7,0", "200,0"),
            measurement("Turbine1", "05.03.2021, 13:50", "6,1", "140,2"),
        ]))
    }

    #[test]
    fn test_validation_rejects_iso_dates() {
        let q = query("Turbine1", "2021-03-05 13:40", "05.03.2021, 14:00");
        assert!(matches!(q.validate(), Err(GetTurbineDataError::InvalidTimeFormat)));
    }

    #[test]
    fn test_datetime_rendering() {
        let data = TurbineData::from(measurement("T", "05.03.2021, 13:40", "1", "2"));
        assert_eq!(data.datetime, "2021-03-05 13:40:00");
    }

    #[tokio::test]
    async fn test_handle_returns_window_in_order() {
        let response = handle(store(), query("Turbine1", "05.03.2021, 13:40", "05.03.2021, 13:50"))
            .await
            .unwrap();

        assert_eq!(response.turbine_id, "Turbine1");
        let times: Vec<&str> = response.data.iter().map(|d| d.datetime.as_str()).collect();
        assert_eq!(times, vec!["2021-03-05 13:40:00", "2021-03-05 13:50:00"]);
        assert_eq!(response.data[1].wind_speed, "6,1");
        assert_eq!(response.data[1].power, "140,2");
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let result = handle(store(), query("Turbine9", "05.03.2021, 13:40", "05.03.2021, 14:00")).await;
        assert!(matches!(result, Err(GetTurbineDataError::NotFound)));
    }

    #[tokio::test]
    async fn test_handle_inverted_window_is_not_found() {
        let result = handle(store(), query("Turbine1", "05.03.2021, 14:00", "05.03.2021, 13:40")).await;
        assert!(matches!(result, Err(GetTurbineDataError::NotFound)));
    }
}
