use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ReadingStore, StoreError, TimeWindow};
use crate::models::DeviceSnapshot;

/// In-process store for local runs and tests. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    log: Arc<RwLock<Vec<DeviceSnapshot>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn insert(&self, snapshot: &DeviceSnapshot) -> Result<DeviceSnapshot, StoreError> {
        self.log.write().await.push(snapshot.clone());
        Ok(snapshot.clone())
    }

    async fn latest_per_device(&self) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let log = self.log.read().await;

        // Equal timestamps keep the earliest insert.
        let mut latest: HashMap<&str, &DeviceSnapshot> = HashMap::new();
        for snapshot in log.iter() {
            latest
                .entry(snapshot.device_id.as_str())
                .and_modify(|current| {
                    if snapshot.timestamp > current.timestamp {
                        *current = snapshot;
                    }
                })
                .or_insert(snapshot);
        }

        let mut devices: Vec<DeviceSnapshot> = latest.into_values().cloned().collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn find_all(&self, window: TimeWindow) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let log = self.log.read().await;
        let mut snapshots: Vec<DeviceSnapshot> = log
            .iter()
            .filter(|s| window.contains(s.timestamp))
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.timestamp);
        Ok(snapshots)
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, StoreError> {
        let log = self.log.read().await;
        let mut snapshots: Vec<DeviceSnapshot> = log
            .iter()
            .rev()
            .filter(|s| s.device_id == device_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(snapshots)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.log.read().await.len() as i64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
