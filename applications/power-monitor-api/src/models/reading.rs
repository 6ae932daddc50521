use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LOAD_NAME: &str = "Unknown";

/// One load (circuit or appliance) as measured by a device at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMeasurement {
    #[serde(rename = "loadId")]
    pub load_id: i64,
    pub name: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    /// Cumulative watt-hours since device boot or last reset.
    pub energy_wh: f64,
}

/// A persisted device report. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub loads: Vec<LoadMeasurement>,
    pub timestamp: DateTime<Utc>,
}

/// Ingestion payload as posted by a device.
///
/// Every field is optional on the wire so that a missing `deviceId` or
/// `loadId` surfaces as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSnapshot {
    #[serde(rename = "deviceId", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub loads: Vec<NewLoad>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLoad {
    #[serde(rename = "loadId", default, skip_serializing_if = "Option::is_none")]
    pub load_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_wh: Option<f64>,
}

impl NewLoad {
    /// Apply document defaults. Callers validate `load_id` first.
    pub fn into_measurement(self, load_id: i64) -> LoadMeasurement {
        LoadMeasurement {
            load_id,
            name: self.name.unwrap_or_else(|| DEFAULT_LOAD_NAME.to_string()),
            voltage: self.voltage.unwrap_or(0.0),
            current: self.current.unwrap_or(0.0),
            power: self.power.unwrap_or(0.0),
            energy_wh: self.energy_wh.unwrap_or(0.0),
        }
    }
}

/// One row of the flattened energy view: a single load of a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRow {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "loadId")]
    pub load_id: i64,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy_wh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConsumptionResponse {
    pub loads: Vec<EnergyRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub message: String,
    pub data: DeviceSnapshot,
}

/// Optional time window for the energy scan. Both bounds absent means a full scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnergyQueryParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_snapshot_accepts_device_payload() {
        let payload: NewSnapshot = serde_json::from_value(json!({
            "deviceId": "ESP32_1",
            "loads": [
                {"loadId": 1, "name": "Fan", "voltage": 230, "current": 0.5, "power": 115, "energy_wh": 10}
            ]
        }))
        .unwrap();

        assert_eq!(payload.device_id.as_deref(), Some("ESP32_1"));
        assert_eq!(payload.loads.len(), 1);
        assert_eq!(payload.loads[0].load_id, Some(1));
        assert_eq!(payload.loads[0].voltage, Some(230.0));
        assert!(payload.timestamp.is_none());
    }

    #[test]
    fn test_new_snapshot_without_device_id_still_decodes() {
        let payload: NewSnapshot = serde_json::from_value(json!({ "loads": [] })).unwrap();
        assert!(payload.device_id.is_none());
    }

    #[test]
    fn test_new_load_defaults() {
        let load = NewLoad {
            load_id: Some(3),
            ..Default::default()
        }
        .into_measurement(3);

        assert_eq!(
            load,
            LoadMeasurement {
                load_id: 3,
                name: "Unknown".to_string(),
                voltage: 0.0,
                current: 0.0,
                power: 0.0,
                energy_wh: 0.0,
            }
        );
    }

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot = DeviceSnapshot {
            id: Uuid::nil(),
            device_id: "ESP32_2".to_string(),
            loads: vec![LoadMeasurement {
                load_id: 2,
                name: "LED".to_string(),
                voltage: 229.5,
                current: 0.04,
                power: 9.2,
                energy_wh: 1.5,
            }],
            timestamp: DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["_id"], json!("00000000-0000-0000-0000-000000000000"));
        assert_eq!(value["deviceId"], json!("ESP32_2"));
        assert_eq!(value["loads"][0]["loadId"], json!(2));
        assert_eq!(value["loads"][0]["energy_wh"], json!(1.5));
        assert_eq!(value["timestamp"], json!("2025-01-01T12:00:00Z"));
    }
}
