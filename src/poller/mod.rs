//! Background poll loop.
//!
//! Every [`POLL_INTERVAL`] the poller fetches one report from its
//! [`DeviceSource`] and, if it decodes, overwrites the gauges. A failed
//! cycle is logged and skipped; the gauges keep their last good values
//! and the next attempt happens on the next tick. There is no retry.

use crate::device::{DeviceSource, PollError};
use crate::metrics::DeviceMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Fixed period between poll cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Result of a single poll cycle.
#[derive(Debug)]
pub enum PollOutcome {
    /// A report was decoded and written to the gauges.
    Published,
    /// The cycle failed; gauges were left untouched.
    Skipped(PollError),
}

impl PollOutcome {
    /// True when the gauges were updated.
    pub fn is_published(&self) -> bool {
        matches!(self, PollOutcome::Published)
    }
}

/// Cycle counters, shared between the loop and its handle.
#[derive(Debug, Default)]
pub struct PollerStats {
    cycles: AtomicU64,
    failures: AtomicU64,
}

impl PollerStats {
    /// Total cycles run.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Cycles that were skipped.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Periodically copies device reports into the gauge store.
pub struct Poller<S> {
    source: S,
    metrics: Arc<DeviceMetrics>,
    interval: Duration,
    stats: Arc<PollerStats>,
}

impl<S: DeviceSource + 'static> Poller<S> {
    /// Creates a poller running every [`POLL_INTERVAL`].
    pub fn new(source: S, metrics: Arc<DeviceMetrics>) -> Self {
        Self::with_interval(source, metrics, POLL_INTERVAL)
    }

    /// Shorter periods keep tests fast; production always uses [`POLL_INTERVAL`].
    pub(crate) fn with_interval(
        source: S,
        metrics: Arc<DeviceMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            metrics,
            interval,
            stats: Arc::new(PollerStats::default()),
        }
    }

    /// Shared cycle counters; stays valid after the poller is spawned.
    pub fn stats(&self) -> Arc<PollerStats> {
        Arc::clone(&self.stats)
    }

    /// Runs one fetch-decode-publish cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        match self.source.fetch_report().await {
            Ok(report) => {
                self.metrics.update(&report);
                debug!(
                    power = report.power,
                    energy_ws = report.energy,
                    relay_on = report.relay_on,
                    temperature = report.temperature,
                    energy_since_boot = report.energy_since_boot,
                    time_since_boot = report.time_since_boot,
                    "Published device report"
                );
                PollOutcome::Published
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                let endpoint = self.source.endpoint();
                match &e {
                    PollError::Decode(_) => {
                        warn!(endpoint, error = %e, "Error decoding device report")
                    }
                    _ => warn!(endpoint, error = %e, "Error fetching device report"),
                }
                PollOutcome::Skipped(e)
            }
        }
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first cycle starts immediately. A fetch still in flight when
    /// shutdown arrives is abandoned.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            endpoint = self.source.endpoint(),
            interval_secs = self.interval.as_secs_f64(),
            "Poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.poll_once() => {}
                        _ = shutdown.changed() => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }
        }

        info!(
            cycles = self.stats.cycles(),
            failures = self.stats.failures(),
            "Poller stopped"
        );
    }

    /// Spawns the loop on the current tokio runtime.
    pub fn spawn(self) -> PollerHandle {
        let (tx, rx) = watch::channel(false);
        let stats = self.stats();
        let task = tokio::spawn(self.run(rx));
        PollerHandle {
            shutdown: tx,
            task,
            stats,
        }
    }
}

/// Handle to a running poll loop.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<PollerStats>,
}

impl PollerHandle {
    /// Cycle counters of the running loop.
    pub fn stats(&self) -> &PollerStats {
        &self.stats
    }

    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
    }
}
