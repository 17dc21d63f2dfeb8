//! Prometheus exporter for the device gauges.
//!
//! # Metrics Exposed
//!
//! - `device_power_watts` - Power consumption in watts
//! - `device_energy_ws` - Energy usage in watt-seconds
//! - `device_relay_status` - Relay state (0: off, 1: on)
//! - `device_temperature_celsius` - Temperature in Celsius
//! - `device_energy_since_boot` - Energy consumed since last boot
//! - `device_time_since_boot` - Seconds elapsed since last boot
//!
//! All six are registered at startup with value 0 and are overwritten in
//! place by every successful poll.
//!
//! # Example
//!
//! ```
//! use power_exporter::{device::DeviceReport, metrics::DeviceMetrics};
//!
//! let metrics = DeviceMetrics::new().expect("Failed to create registry");
//!
//! metrics.update(&DeviceReport {
//!     power: 12.5,
//!     energy: 4400.0,
//!     relay_on: true,
//!     temperature: 21.3,
//!     energy_since_boot: 10000.0,
//!     time_since_boot: 3600,
//! });
//!
//! let text = metrics.encode().unwrap();
//! assert!(text.contains("device_relay_status 1"));
//! ```

mod collector;
mod server;

pub use collector::{DeviceMetrics, MetricsError, MetricsSnapshot};
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
