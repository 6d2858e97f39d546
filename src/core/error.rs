use thiserror::Error;

/// Error type for thermometer acquisition, the logging chain and the controller.
///
/// Variants fall into four groups that callers tell apart with the `is_*`
/// helpers: validation (bad input caught at construction), temperature reading
/// (the device answered but the answer is unusable), I/O and storage (the
/// filesystem or database failed underneath us).
#[derive(Error, Debug)]
pub enum ThermoError {
    /// The serial does not carry the DS18B20 family prefix.
    #[error("Invalid thermometer serial '{serial}': only type {prefix} 1-wire devices are supported")]
    InvalidSerial { serial: String, prefix: &'static str },

    /// The bus master directory does not exist.
    #[error("Bus master path '{path}' doesn't point to a directory")]
    BusPathNotFound { path: String },

    /// A controller was requested for a bus with no thermometers attached.
    #[error("No thermometers found on bus master '{path}'")]
    NoThermometers { path: String },

    /// A decimal temperature string could not be parsed.
    #[error("Invalid temperature '{value}': {reason}")]
    InvalidTemperature { value: String, reason: String },

    /// The device reported a bad CRC or the reading file was malformed.
    #[error("Bad reading from thermometer '{serial}': {reason}")]
    TempReading { serial: String, reason: String },

    /// Failed to read a file from disk.
    #[error("Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory for persisted state.
    #[error("Failed to create directory {path}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An SQLite operation failed.
    #[error("Storage error on {path}")]
    Storage {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// One or more sinks failed while the chain was set to keep going.
    #[error("{} logging sink(s) failed: {}", .failures.len(), summarize(.failures))]
    ChainFailed { failures: Vec<SinkFailure> },

    /// The actuator refused a command.
    #[error("Device '{device}' failed: {reason}")]
    Device { device: String, reason: String },
}

impl ThermoError {
    /// True for errors caused by bad input rather than by the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ThermoError::InvalidSerial { .. }
                | ThermoError::BusPathNotFound { .. }
                | ThermoError::NoThermometers { .. }
                | ThermoError::InvalidTemperature { .. }
        )
    }

    /// True when the device produced an unusable reading.
    pub fn is_temp_reading(&self) -> bool {
        matches!(self, ThermoError::TempReading { .. })
    }

    /// Serial of the thermometer behind a reading failure, if any.
    pub fn serial(&self) -> Option<&str> {
        match self {
            ThermoError::TempReading { serial, .. } | ThermoError::InvalidSerial { serial, .. } => {
                Some(serial)
            }
            _ => None,
        }
    }
}

/// A single sink failure collected by a chain running with
/// [`FailurePolicy::Continue`](crate::core::chain::FailurePolicy::Continue).
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: &'static str,
    pub error: ThermoError,
}

fn summarize(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.sink, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
