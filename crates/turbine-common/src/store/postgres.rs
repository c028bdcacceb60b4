//! PostgreSQL store backend
//!
//! Measurements live in a single table. The decorated source keys map to
//! plain columns:
//!
//! | Source key     | Column        |
//! |----------------|---------------|
//! | `Dat/Zeit`     | `recorded_at` |
//! | `Wind(m/s)`    | `wind_speed`  |
//! | `Leistung(kW)` | `power`       |
//! | anything else  | `extra` JSONB |
//!
//! The `id` column is internal and never selected.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::PgPoolOptions,
    types::Json,
    FromRow, PgPool, Postgres, QueryBuilder,
};
use std::{collections::BTreeMap, time::Duration};

use super::{MeasurementFilter, MeasurementStore, SortOrder, StoreError};
use crate::{error::TurbineError, types::Measurement};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/turbines";

/// Default table holding measurements.
pub const DEFAULT_TABLE: &str = "measurements";

/// Default maximum database connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout in seconds (10 minutes).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default number of rows per INSERT statement.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 1000;

/// Bind parameters used per inserted row.
const BINDS_PER_ROW: usize = 5;

/// PostgreSQL caps a statement at 65535 bind parameters.
pub const MAX_INSERT_BATCH_SIZE: usize = u16::MAX as usize / BINDS_PER_ROW;

/// Connection settings for [`PgMeasurementStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgStoreConfig {
    pub url: String,
    pub table: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub insert_batch_size: usize,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            table: DEFAULT_TABLE.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PgStoreConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// Environment variables:
    /// - `DATABASE_URL`
    /// - `DATABASE_TABLE`
    /// - `DATABASE_MAX_CONNECTIONS`
    /// - `DATABASE_MIN_CONNECTIONS`
    /// - `DATABASE_CONNECT_TIMEOUT`
    /// - `DATABASE_IDLE_TIMEOUT`
    /// - `DATABASE_INSERT_BATCH_SIZE`
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            table: std::env::var("DATABASE_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT", DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_IDLE_TIMEOUT_SECS),
            insert_batch_size: env_or("DATABASE_INSERT_BATCH_SIZE", DEFAULT_INSERT_BATCH_SIZE),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.url.is_empty() {
            return Err(TurbineError::Config("Database URL cannot be empty".to_string()));
        }

        // the table name is interpolated into SQL, so only plain identifiers pass
        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
            .map_err(|e| TurbineError::Config(e.to_string()))?;
        if !identifier.is_match(&self.table) {
            return Err(TurbineError::Config(format!(
                "Invalid table name '{}': expected a plain SQL identifier",
                self.table
            )));
        }

        if self.max_connections == 0 {
            return Err(TurbineError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(TurbineError::Config(format!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        if self.insert_batch_size == 0 || self.insert_batch_size > MAX_INSERT_BATCH_SIZE {
            return Err(TurbineError::Config(format!(
                "Insert batch size must be between 1 and {}",
                MAX_INSERT_BATCH_SIZE
            )));
        }

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct MeasurementRow {
    turbine_id: String,
    recorded_at: NaiveDateTime,
    wind_speed: String,
    power: String,
    extra: Json<BTreeMap<String, String>>,
}

impl From<MeasurementRow> for Measurement {
    fn from(row: MeasurementRow) -> Self {
        Self {
            turbine_id: row.turbine_id,
            timestamp: row.recorded_at,
            wind_speed: row.wind_speed,
            power: row.power,
            extra: row.extra.0,
        }
    }
}

/// Measurement store on a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgMeasurementStore {
    pool: PgPool,
    table: String,
    insert_batch_size: usize,
}

impl PgMeasurementStore {
    /// Open a pool for `config`. Fails when the database is unreachable.
    pub async fn connect(config: &PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!(table = %config.table, "Database connection pool established");

        Ok(Self::from_pool(pool, &config.table, config.insert_batch_size))
    }

    pub fn from_pool(pool: PgPool, table: &str, insert_batch_size: usize) -> Self {
        Self {
            pool,
            table: table.to_string(),
            insert_batch_size: insert_batch_size.clamp(1, MAX_INSERT_BATCH_SIZE),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the measurement table and its `(turbine_id, recorded_at)` index
    /// if they do not exist yet.
    pub async fn provision(&self) -> Result<(), StoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                turbine_id TEXT NOT NULL CHECK (turbine_id <> ''),
                recorded_at TIMESTAMP NOT NULL,
                wind_speed TEXT NOT NULL,
                power TEXT NOT NULL,
                extra JSONB NOT NULL DEFAULT '{{}}'::jsonb
            )
            "#,
            table = self.table
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_turbine_time_idx ON {table} (turbine_id, recorded_at)",
            table = self.table
        );

        sqlx::query(&create_table).execute(&self.pool).await?;
        sqlx::query(&create_index).execute(&self.pool).await?;

        tracing::info!(table = %self.table, "Measurement table provisioned");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MeasurementStore for PgMeasurementStore {
    #[tracing::instrument(skip(self, measurements), fields(table = %self.table, count = measurements.len()))]
    async fn insert_many(&self, measurements: &[Measurement]) -> Result<u64, StoreError> {
        let mut inserted = 0u64;

        for chunk in measurements.chunks(self.insert_batch_size) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (turbine_id, recorded_at, wind_speed, power, extra) ",
                self.table
            ));
            builder.push_values(chunk, |mut row, m| {
                row.push_bind(m.turbine_id.clone())
                    .push_bind(m.timestamp)
                    .push_bind(m.wind_speed.clone())
                    .push_bind(m.power.clone())
                    .push_bind(Json(m.extra.clone()));
            });

            match builder.build().execute(&self.pool).await {
                Ok(result) => inserted += result.rows_affected(),
                Err(source) if inserted > 0 => {
                    return Err(StoreError::PartialInsert { inserted, source });
                },
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(inserted, "Bulk insert complete");
        Ok(inserted)
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    async fn find(
        &self,
        filter: &MeasurementFilter,
        sort: SortOrder,
    ) -> Result<Vec<Measurement>, StoreError> {
        let sql = format!(
            r#"
            SELECT turbine_id, recorded_at, wind_speed, power, extra
            FROM {table}
            WHERE turbine_id = $1 AND recorded_at >= $2 AND recorded_at <= $3
            ORDER BY recorded_at {order}, id ASC
            "#,
            table = self.table,
            order = sort.as_sql()
        );

        let rows = sqlx::query_as::<_, MeasurementRow>(&sql)
            .bind(&filter.turbine_id)
            .bind(filter.window.start)
            .bind(filter.window.end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Measurement::from).collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
