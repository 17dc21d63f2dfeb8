//! Status report decoding.

use super::PollError;
use serde::{Deserialize, Serialize};

/// One status sample as reported by the device.
///
/// Only the six fields below are read; anything else the device puts in
/// the document is ignored. Every listed key must be present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Instantaneous power draw in watts.
    pub power: f64,
    /// Energy counter in watt-seconds.
    #[serde(rename = "Ws")]
    pub energy: f64,
    /// Relay state.
    #[serde(rename = "relay")]
    pub relay_on: bool,
    /// Device temperature in degrees Celsius.
    pub temperature: f64,
    /// Energy consumed since the device last booted.
    pub energy_since_boot: f64,
    /// Seconds since the device last booted.
    pub time_since_boot: i64,
}

impl DeviceReport {
    /// Decodes a report from a raw response body.
    pub fn from_json(body: &[u8]) -> Result<Self, PollError> {
        serde_json::from_slice(body).map_err(PollError::Decode)
    }

    /// Relay state as a gauge value: exactly `1.0` when on, `0.0` when off.
    pub fn relay_value(&self) -> f64 {
        if self.relay_on {
            1.0
        } else {
            0.0
        }
    }
}
