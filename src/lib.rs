//! Power Exporter Library
//!
//! Polls a network-connected power-metering switch over HTTP and
//! republishes its status report as Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! device (HTTP GET /report) → poller → DeviceMetrics ← metrics server (GET /metrics)
//! ```
//!
//! The gauge store is the only thing the poller and the metrics server
//! share. It is an owned object handed to both through an `Arc`; each
//! gauge is individually atomic, so a scrape racing a poll may see a mix
//! of old and new values across gauges, never a torn single value.
//!
//! # Example
//!
//! ```no_run
//! use power_exporter::{
//!     config::ExporterConfig,
//!     device::HttpDevice,
//!     metrics::{DeviceMetrics, MetricsServer},
//!     poller::Poller,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExporterConfig::from_env(None)?;
//! let metrics = Arc::new(DeviceMetrics::new()?);
//!
//! let poller = Poller::new(HttpDevice::new(&config.device)?, Arc::clone(&metrics)).spawn();
//! MetricsServer::new(config.server.into(), metrics).run().await?;
//! poller.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod metrics;
pub mod poller;

// Re-export commonly used types at crate root
pub use config::{ConfigError, ExporterConfig};
pub use device::{DeviceReport, DeviceSource, HttpDevice, MockDevice, PollError};
pub use metrics::{DeviceMetrics, MetricsServer, MetricsServerConfig};
pub use poller::{PollOutcome, Poller, PollerHandle, POLL_INTERVAL};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
