//! Integration tests for the turbine data endpoint
//!
//! These tests verify:
//! - Successful responses carry ordered, text-valued readings
//! - Malformed time bounds are rejected without touching the store
//! - An empty result and a store outage map to different statuses
//! - The health check reflects store reachability

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tower::ServiceExt;
use turbine_common::{
    store::{InMemoryStore, MeasurementFilter, MeasurementStore, SortOrder, StoreError},
    types::{parse_timestamp, Measurement},
};
use turbine_server::{api::create_router, config::Config, features::FeatureState};

fn measurement(turbine_id: &str, at: &str, wind: &str, power: &str) -> Measurement {
    Measurement {
        turbine_id: turbine_id.to_string(),
        timestamp: parse_timestamp(at).unwrap(),
        wind_speed: wind.to_string(),
        power: power.to_string(),
        extra: BTreeMap::new(),
    }
}

fn app(store: Arc<dyn MeasurementStore>) -> Router {
    create_router(FeatureState::new(store), &Config::default())
}

fn seeded_app() -> Router {
    app(Arc::new(InMemoryStore::with_measurements(vec![
        measurement("Turbine1", "05.03.2021, 13:50", "6,1", "140,2"),
        measurement("Turbine1", "05.03.2021, 13:40", "5,3", "100,0"),
        measurement("Turbine1", "05.03.2021, 14:00", "4,9", "90,1"),
        measurement("Turbine2", "05.03.2021, 13:45", "7,0", "200,0"),
    ])))
}

fn data_uri(turbine_id: &str, start: &str, end: &str) -> String {
    let encode = |s: &str| s.replace(' ', "%20").replace(',', "%2C");
    format!(
        "/turbine/{}/data?start_time={}&end_time={}",
        turbine_id,
        encode(start),
        encode(end)
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Store double that counts lookups
#[derive(Default)]
struct CountingStore {
    finds: AtomicUsize,
}

#[async_trait]
impl MeasurementStore for CountingStore {
    async fn insert_many(&self, measurements: &[Measurement]) -> Result<u64, StoreError> {
        Ok(measurements.len() as u64)
    }

    async fn find(
        &self,
        _filter: &MeasurementFilter,
        _sort: SortOrder,
    ) -> Result<Vec<Measurement>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Store double whose backend is down
struct UnavailableStore;

#[async_trait]
impl MeasurementStore for UnavailableStore {
    async fn insert_many(&self, _measurements: &[Measurement]) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find(
        &self,
        _filter: &MeasurementFilter,
        _sort: SortOrder,
    ) -> Result<Vec<Measurement>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_returns_window_in_timestamp_order() {
    let uri = data_uri("Turbine1", "05.03.2021, 13:40", "05.03.2021, 13:50");
    let (status, body) = get(seeded_app(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "turbine_id": "Turbine1",
            "data": [
                { "datetime": "2021-03-05 13:40:00", "wind_speed": "5,3", "power": "100,0" },
                { "datetime": "2021-03-05 13:50:00", "wind_speed": "6,1", "power": "140,2" }
            ]
        })
    );
}

#[tokio::test]
async fn test_malformed_time_is_rejected_without_store_call() {
    let store = Arc::new(CountingStore::default());
    let uri = data_uri("Turbine1", "2021-03-05", "05.03.2021, 14:00");
    let (status, body) = get(app(store.clone()), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid date format. Use DD.MM.YYYY, HH:MM");
    assert_eq!(store.finds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_end_time_is_rejected_without_store_call() {
    let store = Arc::new(CountingStore::default());
    let uri = data_uri("Turbine1", "05.03.2021, 13:40", "05.03.2021, 13:40:00");
    let (status, body) = get(app(store.clone()), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TIME_FORMAT");
    assert_eq!(body["detail"], "Invalid date format. Use DD.MM.YYYY, HH:MM");
    assert_eq!(store.finds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_time_bound_is_rejected() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = get(
        app(store.clone()),
        "/turbine/Turbine1/data?start_time=05.03.2021%2C%2013%3A40",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TIME_FORMAT");
    assert_eq!(store.finds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_window_is_not_found() {
    let uri = data_uri("Turbine1", "06.03.2021, 00:00", "07.03.2021, 00:00");
    let (status, body) = get(seeded_app(), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No data found for the turbine ID and time range.");
}

#[tokio::test]
async fn test_store_failure_is_distinct_from_not_found() {
    let uri = data_uri("Turbine1", "05.03.2021, 13:40", "05.03.2021, 14:00");
    let (status, body) = get(app(Arc::new(UnavailableStore)), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STORE_FAILED");
    assert!(body["detail"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let (status, body) = get(seeded_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app(Arc::new(UnavailableStore)), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORE_UNAVAILABLE");
}
