use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{DeviceSnapshot, LoadMeasurement};

/// Samples kept per load for the live charts.
pub const HISTORY_DEPTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy_wh: f64,
}

impl Sample {
    fn from_load(at: DateTime<Utc>, load: &LoadMeasurement) -> Self {
        Self {
            at,
            voltage: load.voltage,
            current: load.current,
            power: load.power,
            energy_wh: load.energy_wh,
        }
    }
}

/// Rolling per-device, per-load series built from successive polls of the
/// latest snapshots. Each load keeps at most `HISTORY_DEPTH` samples, oldest
/// dropped first.
#[derive(Debug, Clone)]
pub struct LoadHistory {
    depth: usize,
    series: BTreeMap<String, BTreeMap<i64, VecDeque<Sample>>>,
}

impl LoadHistory {
    pub fn new() -> Self {
        Self::with_depth(HISTORY_DEPTH)
    }

    pub fn with_depth(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            series: BTreeMap::new(),
        }
    }

    /// Append one sample per load of every snapshot, stamped with the poll time.
    pub fn record(&mut self, latest: &[DeviceSnapshot], at: DateTime<Utc>) {
        for snapshot in latest {
            let loads = self.series.entry(snapshot.device_id.clone()).or_default();
            for load in &snapshot.loads {
                let samples = loads.entry(load.load_id).or_default();
                samples.push_back(Sample::from_load(at, load));
                while samples.len() > self.depth {
                    samples.pop_front();
                }
            }
        }
    }

    /// Samples of one load, oldest first. Empty if never seen.
    pub fn series(&self, device_id: &str, load_id: i64) -> Vec<Sample> {
        self.series
            .get(device_id)
            .and_then(|loads| loads.get(&load_id))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn loads(&self, device_id: &str) -> impl Iterator<Item = i64> + '_ {
        self.series
            .get(device_id)
            .into_iter()
            .flat_map(|loads| loads.keys().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Default for LoadHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 18, 0, 0).unwrap()
    }

    fn snapshot(device_id: &str, load_ids: &[i64], power: f64) -> DeviceSnapshot {
        DeviceSnapshot {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            loads: load_ids
                .iter()
                .map(|&load_id| LoadMeasurement {
                    load_id,
                    name: "Fan".to_string(),
                    voltage: 230.0,
                    current: power / 230.0,
                    power,
                    energy_wh: power / 10.0,
                })
                .collect(),
            timestamp: start(),
        }
    }

    #[test]
    fn test_records_each_load_separately() {
        let mut history = LoadHistory::new();
        history.record(
            &[snapshot("ESP32_1", &[1, 2], 100.0), snapshot("ESP32_2", &[1], 50.0)],
            start(),
        );

        assert_eq!(history.devices().collect::<Vec<_>>(), vec!["ESP32_1", "ESP32_2"]);
        assert_eq!(history.loads("ESP32_1").collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(history.series("ESP32_2", 1).len(), 1);
        assert_eq!(history.series("ESP32_2", 1)[0].power, 50.0);
    }

    #[test]
    fn test_rolls_over_at_depth() {
        let mut history = LoadHistory::new();
        for i in 0..(HISTORY_DEPTH + 5) {
            let at = start() + Duration::seconds(5 * i as i64);
            history.record(&[snapshot("ESP32_1", &[1], i as f64)], at);
        }

        let series = history.series("ESP32_1", 1);
        assert_eq!(series.len(), HISTORY_DEPTH);
        // Oldest five dropped
        assert_eq!(series[0].power, 5.0);
        assert_eq!(series[HISTORY_DEPTH - 1].power, (HISTORY_DEPTH + 4) as f64);
        assert!(series.windows(2).all(|w| w[0].at < w[1].at));
    }

    #[test]
    fn test_unknown_series_is_empty() {
        let history = LoadHistory::new();
        assert!(history.is_empty());
        assert!(history.series("ESP32_9", 1).is_empty());
        assert_eq!(history.loads("ESP32_9").count(), 0);
    }
}
