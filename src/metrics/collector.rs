//! Gauge store and registry.

use crate::device::DeviceReport;
use prometheus::{Encoder, Gauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Gauge creation, registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Current gauge values, read back from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// `device_power_watts`.
    pub power_watts: f64,
    /// `device_energy_ws`.
    pub energy_ws: f64,
    /// `device_relay_status`, always 0 or 1.
    pub relay_status: f64,
    /// `device_temperature_celsius`.
    pub temperature_celsius: f64,
    /// `device_energy_since_boot`.
    pub energy_since_boot: f64,
    /// `device_time_since_boot`, in seconds.
    pub time_since_boot: f64,
}

/// Prometheus gauges for the device, one per report field.
///
/// Each gauge is an independent atomic value, so the store can be shared
/// between the poller and the scrape handler without a lock.
pub struct DeviceMetrics {
    registry: Registry,

    power: Gauge,
    energy: Gauge,
    relay: Gauge,
    temperature: Gauge,
    energy_since_boot: Gauge,
    time_since_boot: Gauge,
}

impl DeviceMetrics {
    /// Creates a registry with all device gauges registered at zero.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let power = Gauge::new("device_power_watts", "Power consumption in watts")?;
        let energy = Gauge::new("device_energy_ws", "Energy usage in watt-seconds")?;
        let relay = Gauge::new("device_relay_status", "Status of the relay (0: off, 1: on)")?;
        let temperature = Gauge::new("device_temperature_celsius", "Temperature in Celsius")?;
        let energy_since_boot =
            Gauge::new("device_energy_since_boot", "Energy consumed since last boot")?;
        let time_since_boot = Gauge::new("device_time_since_boot", "Time elapsed since last boot")?;

        for gauge in [
            &power,
            &energy,
            &relay,
            &temperature,
            &energy_since_boot,
            &time_since_boot,
        ] {
            registry.register(Box::new(gauge.clone()))?;
        }

        Ok(Self {
            registry,
            power,
            energy,
            relay,
            temperature,
            energy_since_boot,
            time_since_boot,
        })
    }

    /// Overwrites every gauge from a decoded report.
    pub fn update(&self, report: &DeviceReport) {
        self.power.set(report.power);
        self.energy.set(report.energy);
        self.relay.set(report.relay_value());
        self.temperature.set(report.temperature);
        self.energy_since_boot.set(report.energy_since_boot);
        self.time_since_boot.set(report.time_since_boot as f64);
    }

    /// Reads the current gauge values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            power_watts: self.power.get(),
            energy_ws: self.energy.get(),
            relay_status: self.relay.get(),
            temperature_celsius: self.temperature.get(),
            energy_since_boot: self.energy_since_boot.get(),
            time_since_boot: self.time_since_boot.get(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> DeviceReport {
        DeviceReport {
            power: 12.5,
            energy: 4400.0,
            relay_on: true,
            temperature: 21.3,
            energy_since_boot: 10000.0,
            time_since_boot: 3600,
        }
    }

    #[test]
    fn test_registry_creation() {
        let metrics = DeviceMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_independent_registries() {
        // Each store owns its registry, so two can coexist.
        let a = DeviceMetrics::new().unwrap();
        let b = DeviceMetrics::new().unwrap();
        a.update(&sample());
        assert_eq!(b.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_encode_before_update() {
        let metrics = DeviceMetrics::new().unwrap();
        let output = metrics.encode().unwrap();

        for name in [
            "device_power_watts",
            "device_energy_ws",
            "device_relay_status",
            "device_temperature_celsius",
            "device_energy_since_boot",
            "device_time_since_boot",
        ] {
            assert!(output.contains(&format!("# HELP {name} ")), "missing HELP for {name}");
            assert!(output.contains(&format!("# TYPE {name} gauge")), "missing TYPE for {name}");
            assert!(output.contains(&format!("{name} 0\n")), "missing zero value for {name}");
        }
    }

    #[test]
    fn test_update_sample() {
        let metrics = DeviceMetrics::new().unwrap();
        metrics.update(&sample());

        let output = metrics.encode().unwrap();
        assert!(output.contains("device_power_watts 12.5\n"));
        assert!(output.contains("device_energy_ws 4400\n"));
        assert!(output.contains("device_relay_status 1\n"));
        assert!(output.contains("device_temperature_celsius 21.3\n"));
        assert!(output.contains("device_energy_since_boot 10000\n"));
        assert!(output.contains("device_time_since_boot 3600\n"));
    }

    #[test]
    fn test_latest_write_wins() {
        let metrics = DeviceMetrics::new().unwrap();
        metrics.update(&sample());

        let second = DeviceReport {
            power: 3.0,
            relay_on: false,
            ..sample()
        };
        metrics.update(&second);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.power_watts, 3.0);
        assert_eq!(snapshot.relay_status, 0.0);
        assert_eq!(snapshot.energy_ws, 4400.0);
    }

    proptest! {
        #[test]
        fn prop_gauges_match_report(
            power in -1.0e6f64..1.0e6,
            energy in 0.0f64..1.0e12,
            relay_on in any::<bool>(),
            temperature in -50.0f64..150.0,
            energy_since_boot in 0.0f64..1.0e12,
            time_since_boot in 0i64..(1i64 << 40),
        ) {
            let metrics = DeviceMetrics::new().unwrap();
            let report = DeviceReport {
                power,
                energy,
                relay_on,
                temperature,
                energy_since_boot,
                time_since_boot,
            };
            metrics.update(&report);

            let snapshot = metrics.snapshot();
            prop_assert_eq!(snapshot.power_watts, power);
            prop_assert_eq!(snapshot.energy_ws, energy);
            prop_assert_eq!(snapshot.relay_status, if relay_on { 1.0 } else { 0.0 });
            prop_assert_eq!(snapshot.temperature_celsius, temperature);
            prop_assert_eq!(snapshot.energy_since_boot, energy_since_boot);
            prop_assert_eq!(snapshot.time_since_boot, time_since_boot as f64);
        }
    }
}
