use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use clap::Parser;
use power_monitor_api::dashboard::billing::{csv_file_name, BillReport, DEFAULT_RATE_PER_KWH};
use power_monitor_api::dashboard::status::StatusSummary;
use power_monitor_api::dashboard::{Poller, ReadingsClient, POLL_INTERVAL};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Per-load electricity bill from the readings API.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[clap(long = "base-url", default_value = "http://localhost:5000", env = "READINGS_API_URL")]
    base_url: String,

    /// Tariff in currency units per kWh.
    #[clap(long, default_value_t = DEFAULT_RATE_PER_KWH, env = "RATE_PER_KWH")]
    rate: f64,

    /// Write the bill as CSV. `-` writes to stdout, a directory gets a dated file name.
    #[clap(long)]
    csv: Option<PathBuf>,

    /// Keep polling and reprint the bill every time new data arrives.
    #[clap(long)]
    watch: bool,

    /// Print device online/offline status instead of the bill.
    #[clap(long)]
    devices: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    if !(args.rate.is_finite() && args.rate >= 0.0) {
        anyhow::bail!("--rate must be a non-negative number");
    }

    let client = ReadingsClient::new(&args.base_url)?;

    if args.devices {
        let latest = client.latest_readings().await?;
        print_devices(&StatusSummary::from_latest(&latest, Utc::now()));
        return Ok(());
    }

    if args.watch {
        return watch(client, args.rate).await;
    }

    let rows = client.energy_consumption().await?;
    let report = BillReport::from_rows(&rows, args.rate);

    match &args.csv {
        Some(path) => write_csv(&report, path)?,
        None => print_report(&report),
    }

    Ok(())
}

async fn watch(client: ReadingsClient, rate: f64) -> Result<(), anyhow::Error> {
    let mut poller = Poller::spawn("energy", POLL_INTERVAL, move || {
        let client = client.clone();
        async move { client.energy_consumption().await }
    });

    info!("Watching energy consumption, Ctrl+C to stop");

    loop {
        tokio::select! {
            changed = poller.changed() => {
                if !changed {
                    break;
                }
                if let Some(rows) = poller.current() {
                    print_report(&BillReport::from_rows(&rows, rate));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn write_csv(report: &BillReport, path: &Path) -> Result<(), anyhow::Error> {
    if path == Path::new("-") {
        report.write_csv(io::stdout().lock())?;
        return Ok(());
    }

    let target = if path.is_dir() {
        path.join(csv_file_name(Local::now().date_naive()))
    } else {
        path.to_path_buf()
    };

    report.write_csv(File::create(&target)?)?;
    info!(path = %target.display(), "bill written");
    Ok(())
}

fn print_report(report: &BillReport) {
    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "{:<10} {:>4}  {:<16} {:>14} {:>10}",
        "Device", "Load", "Name", "Energy (Wh)", "Bill"
    );
    for line in &report.lines {
        let _ = writeln!(
            out,
            "{:<10} {:>4}  {:<16} {:>14.5} {:>10.2}",
            line.load.device_id, line.load.load_id, line.name, line.load.energy_wh, line.bill
        );
    }
    let _ = writeln!(
        out,
        "Total: {:.3} kWh at {:.2}/kWh = {:.2}",
        report.total_kwh(),
        report.rate_per_kwh,
        report.total_bill
    );
}

fn print_devices(summary: &StatusSummary) {
    println!(
        "{} devices, {} online, {} offline",
        summary.total, summary.online, summary.offline
    );
    for device in &summary.devices {
        println!(
            "{:<12} {:<8} last seen {}",
            device.device_id,
            device.status.label(),
            device.last_seen.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
}
