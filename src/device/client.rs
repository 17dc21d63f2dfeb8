//! Device transport.
//!
//! [`HttpDevice`] talks to the real switch; [`MockDevice`] replays a
//! scripted sequence of outcomes so the poll loop can be tested without
//! a network.

use super::DeviceReport;
use crate::config::DeviceConfig;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while obtaining a report.
///
/// All of these are local to one poll cycle.
#[derive(Debug, Error)]
pub enum PollError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Connection, timeout or body transfer failure.
    #[error("request to device failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The device answered with a non-2xx status.
    #[error("device responded with HTTP {0}")]
    Status(reqwest::StatusCode),
    /// The body is not a valid report.
    #[error("failed to decode device report: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of device reports.
///
/// The poller only needs "give me the latest report"; this abstraction
/// allows swapping the HTTP device for a scripted one in tests.
pub trait DeviceSource: Send + Sync {
    /// Fetches and decodes one report.
    fn fetch_report(&self) -> impl Future<Output = Result<DeviceReport, PollError>> + Send;

    /// Human-readable location of the device, for logs.
    fn endpoint(&self) -> &str;
}

/// The metering switch reached over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpDevice {
    client: reqwest::Client,
    report_url: String,
}

impl HttpDevice {
    /// Builds a client for `http://<host>/report` with the configured timeout.
    ///
    /// The switch sits on the local network, so system proxies are ignored.
    pub fn new(config: &DeviceConfig) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .no_proxy()
            .build()
            .map_err(PollError::Client)?;

        Ok(Self {
            client,
            report_url: config.report_url(),
        })
    }

    /// Full URL of the report document.
    pub fn report_url(&self) -> &str {
        &self.report_url
    }
}

impl DeviceSource for HttpDevice {
    async fn fetch_report(&self) -> Result<DeviceReport, PollError> {
        let response = self.client.get(&self.report_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status));
        }

        let body = response.bytes().await?;
        DeviceReport::from_json(&body)
    }

    fn endpoint(&self) -> &str {
        &self.report_url
    }
}

/// Scripted device for testing.
///
/// Outcomes are consumed in order; once only one remains it is repeated
/// for every further fetch. `None` entries fail as an unavailable device.
#[derive(Debug, Default)]
pub struct MockDevice {
    script: Mutex<VecDeque<Option<DeviceReport>>>,
    fetches: AtomicU64,
}

impl MockDevice {
    /// Creates a device with an empty script; every fetch fails until one is queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful fetch.
    pub fn push_report(&self, report: DeviceReport) -> &Self {
        self.push(Some(report))
    }

    /// Queues a failed fetch.
    pub fn push_failure(&self) -> &Self {
        self.push(None)
    }

    /// Number of fetches served so far.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn push(&self, outcome: Option<DeviceReport>) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    fn next_outcome(&self) -> Option<DeviceReport> {
        let mut script = self.script.lock().ok()?;
        if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        }
    }
}

impl DeviceSource for MockDevice {
    async fn fetch_report(&self) -> Result<DeviceReport, PollError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.next_outcome()
            .ok_or(PollError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }

    fn endpoint(&self) -> &str {
        "mock://device/report"
    }
}
