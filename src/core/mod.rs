//! Thermometer acquisition, the logging chain and the cooling controller.

/// Enumeration of thermometers on a w1 bus master.
pub mod bus;

/// Logging chain and its sinks (text, SQLite).
pub mod chain;

/// Threshold cooling controller.
pub mod controller;

/// One poll cycle over the bus, plus the display pass.
pub mod cycle;

/// Actuator capability and its mock.
pub mod device;

/// Error types shared by the core modules.
pub mod error;

/// Fixed-point decimal temperatures.
pub mod temperature;

/// DS18B20 thermometer handle and `w1_slave` parsing.
pub mod thermometer;

/// Result alias.
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
