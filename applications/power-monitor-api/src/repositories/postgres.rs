use async_trait::async_trait;
use sqlx::{postgres::PgRow, types::Json, FromRow, Row};

use super::{ReadingStore, StoreError, TimeWindow};
use crate::db::DbPool;
use crate::models::{DeviceSnapshot, LoadMeasurement};

const SCHEMA: &str = include_str!("../../migrations/0001_create_power_readings.sql");

#[derive(Clone)]
pub struct PgReadingStore {
    pool: DbPool,
}

impl<'r> FromRow<'r, PgRow> for DeviceSnapshot {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(loads): Json<Vec<LoadMeasurement>> = row.try_get("loads")?;
        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            loads,
            timestamp: row.try_get("ts")?,
        })
    }
}

impl PgReadingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the readings table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn insert(&self, snapshot: &DeviceSnapshot) -> Result<DeviceSnapshot, StoreError> {
        let stored = sqlx::query_as::<_, DeviceSnapshot>(
            r#"
            INSERT INTO power_readings (id, device_id, loads, ts)
            VALUES ($1, $2, $3, $4)
            RETURNING id, device_id, loads, ts
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.device_id)
        .bind(Json(&snapshot.loads))
        .bind(snapshot.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn latest_per_device(&self) -> Result<Vec<DeviceSnapshot>, StoreError> {
        // DISTINCT ON keeps the first row per device; equal timestamps resolve arbitrarily.
        let snapshots = sqlx::query_as::<_, DeviceSnapshot>(
            r#"
            SELECT DISTINCT ON (device_id) id, device_id, loads, ts
            FROM power_readings
            ORDER BY device_id, ts DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    async fn find_all(&self, window: TimeWindow) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let snapshots = sqlx::query_as::<_, DeviceSnapshot>(
            r#"
            SELECT id, device_id, loads, ts
            FROM power_readings
            WHERE ($1::timestamptz IS NULL OR ts >= $1)
              AND ($2::timestamptz IS NULL OR ts < $2)
            ORDER BY ts
            "#,
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let snapshots = sqlx::query_as::<_, DeviceSnapshot>(
            r#"
            SELECT id, device_id, loads, ts
            FROM power_readings
            WHERE device_id = $1
            ORDER BY ts DESC
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM power_readings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("connection pool closed".to_string()));
        }
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
