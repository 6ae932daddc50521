//! Client-side views over the readings API: the HTTP client, a fixed-interval
//! poller, and the derived computations dashboards render (device status,
//! per-load billing, chart history).

pub mod billing;
pub mod client;
pub mod history;
pub mod poller;
pub mod status;

pub use billing::{BillLine, BillReport, DEFAULT_RATE_PER_KWH};
pub use client::{ApiError, ReadingsClient};
pub use history::LoadHistory;
pub use poller::{Poller, POLL_INTERVAL};
pub use status::{DeviceStatus, StatusSummary};
