use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::DeviceSnapshot;

/// A device counts as online if it reported within this window.
pub fn online_window() -> Duration {
    Duration::minutes(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl DeviceStatus {
    pub fn classify(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now - last_seen < online_window() {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "Online",
            DeviceStatus::Offline => "Offline",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceRow {
    pub device_id: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub devices: Vec<DeviceRow>,
}

impl StatusSummary {
    /// Classify the output of the latest-snapshot query. No hysteresis: each
    /// call looks only at `now` and the snapshot timestamps.
    pub fn from_latest(latest: &[DeviceSnapshot], now: DateTime<Utc>) -> Self {
        let devices: Vec<DeviceRow> = latest
            .iter()
            .map(|s| DeviceRow {
                device_id: s.device_id.clone(),
                status: DeviceStatus::classify(s.timestamp, now),
                last_seen: s.timestamp,
            })
            .collect();

        let online = devices
            .iter()
            .filter(|d| d.status == DeviceStatus::Online)
            .count();

        Self {
            total: devices.len(),
            online,
            offline: devices.len() - online,
            devices,
        }
    }
}
