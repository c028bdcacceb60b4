//! Turbine API routes
//!
//! # Route Structure
//!
//! - `GET /turbine/:turbine_id/data?start_time=..&end_time=..` - Measurements in a time window
//!
//! Both bounds use `DD.MM.YYYY, HH:MM` and are inclusive.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use turbine_common::store::MeasurementStore;

use super::queries::{GetTurbineDataError, GetTurbineDataQuery};
use crate::api::response::ErrorResponse;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn turbines_routes() -> Router<Arc<dyn MeasurementStore>> {
    Router::new().route("/:turbine_id/data", get(get_turbine_data))
}

/// Query string of the data endpoint. Missing bounds are reported the same
/// way as malformed ones.
#[derive(Debug, Deserialize)]
struct TimeRangeParams {
    start_time: Option<String>,
    end_time: Option<String>,
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get the measurements of one turbine
///
/// # Response
///
/// - `200 OK` - `{"turbine_id": "...", "data": [{"datetime", "wind_speed", "power"}]}`
/// - `400 Bad Request` - Malformed time bound, or the store failed
/// - `404 Not Found` - No measurements in the window
#[tracing::instrument(skip(store, params), fields(turbine_id = %turbine_id))]
async fn get_turbine_data(
    State(store): State<Arc<dyn MeasurementStore>>,
    Path(turbine_id): Path<String>,
    Query(params): Query<TimeRangeParams>,
) -> Result<Response, TurbineApiError> {
    let (Some(start_time), Some(end_time)) = (params.start_time, params.end_time) else {
        return Err(GetTurbineDataError::InvalidTimeFormat.into());
    };

    let query = GetTurbineDataQuery {
        turbine_id,
        start_time,
        end_time,
    };

    let response = super::queries::get_turbine_data::handle(store, query).await?;

    tracing::debug!(count = response.data.len(), "Turbine data retrieved via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
struct TurbineApiError(GetTurbineDataError);

impl From<GetTurbineDataError> for TurbineApiError {
    fn from(err: GetTurbineDataError) -> Self {
        Self(err)
    }
}

impl IntoResponse for TurbineApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            GetTurbineDataError::InvalidTimeFormat => (StatusCode::BAD_REQUEST, "INVALID_TIME_FORMAT"),
            GetTurbineDataError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GetTurbineDataError::StoreFailed(e) => {
                tracing::error!(error = %e, "Store failed while querying turbine data");
                (StatusCode::BAD_REQUEST, "STORE_FAILED")
            },
        };

        ErrorResponse::new(code, self.0.to_string()).with_status(status)
    }
}
