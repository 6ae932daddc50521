use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    DeviceSnapshot, EnergyConsumptionResponse, EnergyQueryParams, EnergyRow, NewSnapshot,
};
use crate::repositories::{ReadingStore, StoreError, TimeWindow};

#[derive(Clone)]
pub struct ReadingsService {
    store: Arc<dyn ReadingStore>,
}

impl ReadingsService {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Validate a device payload and append it to the log.
    pub async fn ingest(&self, payload: NewSnapshot) -> Result<DeviceSnapshot> {
        let snapshot = build_snapshot(payload, Utc::now())?;

        let stored = self.store.insert(&snapshot).await.map_err(AppError::Write)?;
        tracing::debug!(
            device_id = %stored.device_id,
            loads = stored.loads.len(),
            "reading saved"
        );
        Ok(stored)
    }

    pub async fn latest(&self) -> Result<Vec<DeviceSnapshot>> {
        Ok(self.store.latest_per_device().await?)
    }

    pub async fn energy_consumption(
        &self,
        params: EnergyQueryParams,
    ) -> Result<EnergyConsumptionResponse> {
        if let (Some(from), Some(to)) = (params.from, params.to) {
            if from > to {
                return Err(AppError::Validation(
                    "from must not be after to".to_string(),
                ));
            }
        }

        let window = TimeWindow {
            from: params.from,
            to: params.to,
        };
        let snapshots = self.store.find_all(window).await?;

        Ok(EnergyConsumptionResponse {
            loads: flatten_loads(&snapshots),
        })
    }

    pub async fn device_history(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>> {
        Ok(self.store.find_by_device(device_id).await?)
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(self.store.count().await?)
    }

    pub async fn health_check(&self) -> std::result::Result<(), StoreError> {
        self.store.health_check().await
    }
}

/// Turn a payload into an immutable record, applying defaults.
///
/// Timestamps are truncated to microseconds so that the record returned on
/// write matches what Postgres hands back on read.
pub fn build_snapshot(payload: NewSnapshot, received_at: DateTime<Utc>) -> Result<DeviceSnapshot> {
    let device_id = match payload.device_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(AppError::Validation("deviceId is required".to_string())),
    };

    let mut seen = HashSet::new();
    let mut loads = Vec::with_capacity(payload.loads.len());
    for (index, load) in payload.loads.into_iter().enumerate() {
        let load_id = load.load_id.ok_or_else(|| {
            AppError::Validation(format!("loads[{}].loadId is required", index))
        })?;
        if load_id < 1 {
            return Err(AppError::Validation(format!(
                "loads[{}].loadId must be at least 1",
                index
            )));
        }
        if !seen.insert(load_id) {
            return Err(AppError::Validation(format!(
                "loadId {} appears more than once",
                load_id
            )));
        }

        let measurement = load.into_measurement(load_id);
        for (field, value) in [
            ("voltage", measurement.voltage),
            ("current", measurement.current),
            ("power", measurement.power),
            ("energy_wh", measurement.energy_wh),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Validation(format!(
                    "loads[{}].{} must be a non-negative number",
                    index, field
                )));
            }
        }
        loads.push(measurement);
    }

    Ok(DeviceSnapshot {
        id: Uuid::new_v4(),
        device_id,
        loads,
        timestamp: payload.timestamp.unwrap_or(received_at).trunc_subsecs(6),
    })
}

/// One row per (snapshot, load) pair, in snapshot order then load order.
pub fn flatten_loads(snapshots: &[DeviceSnapshot]) -> Vec<EnergyRow> {
    snapshots
        .iter()
        .flat_map(|snapshot| {
            snapshot.loads.iter().map(move |load| EnergyRow {
                device_id: snapshot.device_id.clone(),
                load_id: load.load_id,
                voltage: load.voltage,
                current: load.current,
                power: load.power,
                energy_wh: load.energy_wh,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadMeasurement, NewLoad};
    use chrono::TimeZone;

    fn load(load_id: i64, energy_wh: f64) -> NewLoad {
        NewLoad {
            load_id: Some(load_id),
            name: Some("Fan".to_string()),
            voltage: Some(230.0),
            current: Some(0.5),
            power: Some(115.0),
            energy_wh: Some(energy_wh),
        }
    }

    fn payload(device_id: Option<&str>, loads: Vec<NewLoad>) -> NewSnapshot {
        NewSnapshot {
            device_id: device_id.map(str::to_string),
            loads,
            timestamp: None,
        }
    }

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_build_snapshot_defaults_timestamp_to_receipt_time() {
        let snapshot = build_snapshot(payload(Some("ESP32_1"), vec![load(1, 10.0)]), received())
            .unwrap();

        assert_eq!(snapshot.device_id, "ESP32_1");
        assert_eq!(snapshot.timestamp, received());
        assert_eq!(snapshot.loads.len(), 1);
    }

    #[test]
    fn test_build_snapshot_keeps_device_timestamp() {
        let device_ts = Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 0).unwrap();
        let mut p = payload(Some("ESP32_1"), vec![]);
        p.timestamp = Some(device_ts);

        let snapshot = build_snapshot(p, received()).unwrap();
        assert_eq!(snapshot.timestamp, device_ts);
        assert!(snapshot.loads.is_empty());
    }

    #[test]
    fn test_build_snapshot_truncates_to_microseconds() {
        let precise = received() + chrono::Duration::nanoseconds(1_234_567);
        let snapshot = build_snapshot(payload(Some("ESP32_1"), vec![]), precise).unwrap();

        assert_eq!(snapshot.timestamp, received() + chrono::Duration::microseconds(1_234));
    }

    #[test]
    fn test_build_snapshot_requires_device_id() {
        for device_id in [None, Some(""), Some("   ")] {
            let result = build_snapshot(payload(device_id, vec![load(1, 1.0)]), received());
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_build_snapshot_requires_load_id() {
        let mut missing = load(1, 1.0);
        missing.load_id = None;

        let result = build_snapshot(payload(Some("ESP32_1"), vec![missing]), received());
        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("loadId")));
    }

    #[test]
    fn test_build_snapshot_rejects_zero_load_id() {
        let result = build_snapshot(payload(Some("ESP32_1"), vec![load(0, 1.0)]), received());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_build_snapshot_rejects_duplicate_load_id() {
        let result = build_snapshot(
            payload(Some("ESP32_1"), vec![load(2, 1.0), load(2, 3.0)]),
            received(),
        );
        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("more than once")));
    }

    #[test]
    fn test_build_snapshot_rejects_negative_measurement() {
        let mut bad = load(1, 1.0);
        bad.power = Some(-5.0);

        let result = build_snapshot(payload(Some("ESP32_1"), vec![bad]), received());
        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("power")));
    }

    #[test]
    fn test_flatten_loads_row_count_and_fields() {
        let ts = received();
        let snapshots = vec![
            DeviceSnapshot {
                id: Uuid::new_v4(),
                device_id: "ESP32_1".to_string(),
                loads: vec![
                    load(1, 10.0).into_measurement(1),
                    load(2, 4.0).into_measurement(2),
                ],
                timestamp: ts,
            },
            DeviceSnapshot {
                id: Uuid::new_v4(),
                device_id: "ESP32_2".to_string(),
                loads: vec![],
                timestamp: ts,
            },
            DeviceSnapshot {
                id: Uuid::new_v4(),
                device_id: "ESP32_2".to_string(),
                loads: vec![LoadMeasurement {
                    load_id: 1,
                    name: "Fan".to_string(),
                    voltage: 228.0,
                    current: 0.4,
                    power: 91.2,
                    energy_wh: 2.0,
                }],
                timestamp: ts,
            },
        ];

        let rows = flatten_loads(&snapshots);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].device_id, "ESP32_1");
        assert_eq!(rows[1].load_id, 2);
        assert_eq!(rows[2].device_id, "ESP32_2");
        assert_eq!(rows[2].voltage, 228.0);
    }
}
