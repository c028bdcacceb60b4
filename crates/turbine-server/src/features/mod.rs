//! Feature modules implementing the turbine API
//!
//! Each feature is a vertical slice with its own queries and routes.
//!
//! # Features
//!
//! - **turbines**: Time-windowed measurement retrieval per turbine
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `queries/` - Read operations, one module per query with a `handle` function
//! - `routes.rs` - HTTP route definitions and error-to-status mapping

pub mod turbines;

use axum::Router;
use std::sync::Arc;
use turbine_common::store::MeasurementStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Measurement store created once at startup
    pub store: Arc<dyn MeasurementStore>,
}

impl FeatureState {
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self { store }
    }
}

/// Creates the router with all feature routes mounted
///
/// - `/turbine` - Turbine measurements
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/turbine", turbines::turbines_routes().with_state(state.store))
}
