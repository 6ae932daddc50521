pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::DeviceSnapshot;

pub use memory::MemoryReadingStore;
pub use postgres::PgReadingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Half-open `[from, to)` bound on snapshot timestamps. `None` on a side leaves it open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts < to)
    }
}

/// Append-only log of device snapshots.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist one snapshot and return it as stored.
    async fn insert(&self, snapshot: &DeviceSnapshot) -> Result<DeviceSnapshot, StoreError>;

    /// The most recent snapshot of every device that has reported at least once.
    async fn latest_per_device(&self) -> Result<Vec<DeviceSnapshot>, StoreError>;

    /// Every snapshot inside `window`, oldest first.
    async fn find_all(&self, window: TimeWindow) -> Result<Vec<DeviceSnapshot>, StoreError>;

    /// All snapshots for one device, newest first.
    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
