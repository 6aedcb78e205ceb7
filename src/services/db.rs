// src/services/db.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::SinkError;
use crate::models::IndicatorId;
use super::sink::{check_value, Sink};

const CREATE_FACT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fact_raw_data (
    metric_id  INTEGER          NOT NULL,
    data_date  DATE             NOT NULL,
    value      DOUBLE PRECISION NOT NULL,
    created_at TIMESTAMPTZ      NOT NULL DEFAULT NOW(),
    PRIMARY KEY (metric_id, data_date)
)
"#;

const UPSERT_FACT: &str = r#"
INSERT INTO fact_raw_data (metric_id, data_date, value)
VALUES ($1, $2, $3)
ON CONFLICT (metric_id, data_date)
DO UPDATE SET value = EXCLUDED.value, created_at = NOW()
"#;

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Postgres-backed fact table.
///
/// The pool connects on first use, so an unreachable database shows up as a
/// failed `upsert` for each task rather than as a startup error.
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    /// Fails only when `database_url` cannot be parsed.
    pub fn connect_lazy(database_url: &str, acquire_timeout: Duration) -> Result<Self, SinkError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), SinkError> {
        sqlx::query(CREATE_FACT_TABLE).execute(&self.pool).await?;
        info!("fact_raw_data table is in place");
        Ok(())
    }
}

#[async_trait]
impl Sink for PgSink {
    async fn upsert(&self, indicator_id: IndicatorId, date: NaiveDate, value: f64) -> Result<(), SinkError> {
        check_value(value)?;
        info!("Saving data: metric_id={}, date={}, value={}", indicator_id, date, value);

        // Held for this write only; returned to the pool when dropped,
        // whether or not the statement succeeds.
        let mut conn = self.pool.acquire().await?;
        sqlx::query(UPSERT_FACT)
            .bind(indicator_id.0)
            .bind(date)
            .bind(value)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                error!("Database save failed: {}", e);
                SinkError::from(e)
            })?;

        Ok(())
    }
}
