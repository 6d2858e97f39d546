//! Actuator capability driven by the cooling controller.
//!
//! The controller only decides; whatever switches the cooler implements
//! [`DeviceInterface`]. The handle is built once at start-up from
//! [`DeviceKind`] and handed to
//! [`TempController::apply`](crate::core::controller::TempController::apply).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::ThermoResult;

/// An on/off actuator such as a relay driving a fridge compressor.
pub trait DeviceInterface {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Switches the device on.
    fn turn_on(&mut self) -> ThermoResult<()>;

    /// Switches the device off.
    fn turn_off(&mut self) -> ThermoResult<()>;
}

/// Last command received by a [`MockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    On,
    Off,
}

/// Device that accepts every command and remembers the last one.
#[derive(Debug, Default)]
pub struct MockDevice {
    last: Option<DeviceCommand>,
    calls: usize,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_command(&self) -> Option<DeviceCommand> {
        self.last
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    fn record(&mut self, command: DeviceCommand) {
        debug!("Mock device received {:?}", command);
        self.last = Some(command);
        self.calls += 1;
    }
}

impl DeviceInterface for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn turn_on(&mut self) -> ThermoResult<()> {
        self.record(DeviceCommand::On);
        Ok(())
    }

    fn turn_off(&mut self) -> ThermoResult<()> {
        self.record(DeviceCommand::Off);
        Ok(())
    }
}

/// Which actuator to construct at start-up.
///
/// Only the mock exists; a GPIO relay would be added as another variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Mock,
}

impl DeviceKind {
    /// Builds the device handle for this kind.
    pub fn build(self) -> Box<dyn DeviceInterface> {
        match self {
            DeviceKind::Mock => Box::new(MockDevice::new()),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Mock => f.write_str("mock"),
        }
    }
}
