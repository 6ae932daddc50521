use std::collections::BTreeMap;
use std::io;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::EnergyRow;

pub const DEFAULT_RATE_PER_KWH: f64 = 5.5;

const CSV_HEADERS: [&str; 8] = [
    "Device ID",
    "Load ID",
    "Load Name",
    "Voltage (V)",
    "Current (A)",
    "Power (W)",
    "Energy (Wh)",
    "Bill (₹)",
];

/// Display name of the appliance wired to a load channel.
pub fn load_name(load_id: i64) -> String {
    match load_id {
        1 => "Fan".to_string(),
        2 => "LED".to_string(),
        3 => "Mobile Charger".to_string(),
        4 => "Laptop Charger".to_string(),
        other => format!("Load {}", other),
    }
}

pub fn calculate_bill(energy_wh: f64, rate_per_kwh: f64) -> f64 {
    (energy_wh / 1000.0) * rate_per_kwh
}

/// Group flat energy rows by `loadId`, ascending.
///
/// The first row seen for a load supplies device, voltage, current and power;
/// `energy_wh` is the sum over every row of that load across all devices.
pub fn group_by_load(rows: &[EnergyRow]) -> Vec<EnergyRow> {
    let mut groups: BTreeMap<i64, EnergyRow> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.load_id)
            .and_modify(|g| g.energy_wh += row.energy_wh)
            .or_insert_with(|| row.clone());
    }
    groups.into_values().collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BillLine {
    #[serde(flatten)]
    pub load: EnergyRow,
    pub name: String,
    pub bill: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillReport {
    pub rate_per_kwh: f64,
    pub lines: Vec<BillLine>,
    pub total_energy_wh: f64,
    pub total_bill: f64,
}

impl BillReport {
    pub fn from_rows(rows: &[EnergyRow], rate_per_kwh: f64) -> Self {
        let lines: Vec<BillLine> = group_by_load(rows)
            .into_iter()
            .map(|load| BillLine {
                name: load_name(load.load_id),
                bill: calculate_bill(load.energy_wh, rate_per_kwh),
                load,
            })
            .collect();

        let total_energy_wh = lines.iter().map(|l| l.load.energy_wh).sum();

        Self {
            rate_per_kwh,
            total_bill: calculate_bill(total_energy_wh, rate_per_kwh),
            total_energy_wh,
            lines,
        }
    }

    pub fn total_kwh(&self) -> f64 {
        self.total_energy_wh / 1000.0
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADERS)?;

        for line in &self.lines {
            wtr.write_record([
                line.load.device_id.clone(),
                line.load.load_id.to_string(),
                line.name.clone(),
                format!("{:.2}", line.load.voltage),
                format!("{:.3}", line.load.current),
                format!("{:.2}", line.load.power),
                format!("{:.5}", line.load.energy_wh),
                format!("{:.2}", line.bill),
            ])?;
        }

        wtr.write_record([
            "TOTAL".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            format!("{:.5}", self.total_energy_wh),
            format!("{:.2}", self.total_bill),
        ])?;

        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// File name the dashboard offers for a bill exported on `date`.
pub fn csv_file_name(date: NaiveDate) -> String {
    format!("electric_bill_{}.csv", date.format("%Y-%m-%d"))
}
