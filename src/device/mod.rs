//! Device access and the report wire format.
//!
//! The metering switch is treated as an opaque HTTP endpoint that hands
//! back one JSON status document per request. This module decodes that
//! document and abstracts the transport behind [`DeviceSource`] so the
//! poll loop can be driven by a scripted source in tests.

mod client;
mod report;

pub use client::{DeviceSource, HttpDevice, MockDevice, PollError};
pub use report::DeviceReport;
