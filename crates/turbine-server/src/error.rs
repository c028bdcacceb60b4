//! Server-specific error types
//!
//! Feature slices map their own query errors to responses in their route
//! modules; `AppError` covers the handlers that sit outside a slice.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use turbine_common::store::StoreError;

use crate::api::response::ErrorResponse;

/// Result type alias for handlers outside a feature slice
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, detail) = match self {
            AppError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                ("STORE_UNAVAILABLE", "The measurement store is unavailable")
            },
        };

        ErrorResponse::new(code, detail).with_status(status)
    }
}
