//! Chain of logging sinks.
//!
//! A [`LoggerChain`] is a singly linked list of nodes, each owning one
//! [`ThermoSink`]. Events are dispatched head to tail, synchronously. The
//! thermometer is read once per event so every sink records the same values.
//!
//! What happens when a sink fails is set by [`FailurePolicy`]: `Abort` stops at
//! the first failure, `Continue` runs every sink and reports all failures
//! together.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error};

use super::{
    controller::{ControllerState, TempController},
    error::{SinkFailure, ThermoError},
    temperature::Temperature,
    thermometer::Thermometer,
    types::ThermoResult,
};

pub mod sql;
pub mod text;

pub use sql::SqlSink;
pub use text::TextSink;

/// A single temperature acquisition, shared by every sink of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperaturePoint {
    pub serial: String,
    pub celsius: Temperature,
    pub fahrenheit: Temperature,
    pub recorded_at: OffsetDateTime,
}

impl TemperaturePoint {
    /// Reads `thermometer` once and stamps the reading with the current UTC time.
    pub fn read(thermometer: &Thermometer) -> ThermoResult<Self> {
        let celsius = thermometer.read_celsius()?;
        Ok(TemperaturePoint {
            serial: thermometer.serial().to_string(),
            celsius,
            fahrenheit: celsius.celsius_to_fahrenheit(),
            recorded_at: OffsetDateTime::now_utc(),
        })
    }
}

/// The controller facts a sink gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub serial: String,
    pub current_f: Option<Temperature>,
    pub max_temp_f: Temperature,
    pub state: ControllerState,
}

impl From<&TempController> for ControllerSnapshot {
    fn from(controller: &TempController) -> Self {
        ControllerSnapshot {
            serial: controller.thermometer().serial().to_string(),
            current_f: controller.last_reading_f(),
            max_temp_f: controller.max_temp_f(),
            state: controller.state(),
        }
    }
}

/// A destination for thermometer and controller events.
///
/// Both methods are required. A sink with nothing to record for an event kind
/// implements it as `Ok(())`.
pub trait ThermoSink: Send {
    /// Short name used when reporting failures.
    fn name(&self) -> &'static str;

    /// Records a temperature reading.
    fn log_temperature(&self, point: &TemperaturePoint) -> ThermoResult<()>;

    /// Records the outcome of a controller run.
    fn log_controller_state(&self, snapshot: &ControllerSnapshot) -> ThermoResult<()>;
}

/// What the chain does after a sink fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing sink and return its error.
    #[default]
    Abort,
    /// Run every sink and return [`ThermoError::ChainFailed`] if any failed.
    Continue,
}

/// One node of the chain: a sink and the rest of the chain after it.
pub struct LoggerChain {
    sink: Box<dyn ThermoSink>,
    next: Option<Box<LoggerChain>>,
    policy: FailurePolicy,
}

impl LoggerChain {
    /// Starts a chain with a single sink and the default `Abort` policy.
    pub fn new(sink: impl ThermoSink + 'static) -> Self {
        Self::from_boxed(Box::new(sink))
    }

    pub fn from_boxed(sink: Box<dyn ThermoSink>) -> Self {
        LoggerChain {
            sink,
            next: None,
            policy: FailurePolicy::default(),
        }
    }

    /// Sets the failure policy. Only the head's policy is consulted.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Appends a sink at the tail.
    pub fn append(&mut self, sink: impl ThermoSink + 'static) -> &mut Self {
        self.append_chain(LoggerChain::new(sink))
    }

    /// Appends a whole chain at the tail, never replacing an existing link.
    pub fn append_chain(&mut self, chain: LoggerChain) -> &mut Self {
        if let Some(next) = self.next.as_mut() {
            next.append_chain(chain);
        } else {
            self.next = Some(Box::new(chain));
        }
        self
    }

    /// The node after this one.
    pub fn next(&self) -> Option<&LoggerChain> {
        self.next.as_deref()
    }

    /// The sink held by this node.
    pub fn sink(&self) -> &dyn ThermoSink {
        self.sink.as_ref()
    }

    /// Iterates over the nodes from this one to the tail.
    pub fn iter(&self) -> Nodes<'_> {
        Nodes { node: Some(self) }
    }

    /// Number of nodes from this one to the tail.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Names of the sinks in dispatch order.
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.iter().map(|node| node.sink.name()).collect()
    }

    /// Reads `thermometer` once and hands the reading to every sink.
    ///
    /// A failed reading is returned before any sink runs.
    pub fn log_temperature(&self, thermometer: &Thermometer) -> ThermoResult<()> {
        let point = TemperaturePoint::read(thermometer)?;
        self.dispatch(|sink| sink.log_temperature(&point))
    }

    /// Hands the controller's current state to every sink.
    pub fn log_controller_state(&self, controller: &TempController) -> ThermoResult<()> {
        let snapshot = ControllerSnapshot::from(controller);
        self.dispatch(|sink| sink.log_controller_state(&snapshot))
    }

    fn dispatch<F>(&self, mut event: F) -> ThermoResult<()>
    where
        F: FnMut(&dyn ThermoSink) -> ThermoResult<()>,
    {
        let mut failures = Vec::new();

        for node in self.iter() {
            let sink = node.sink();
            match event(sink) {
                Ok(()) => debug!("Sink '{}' recorded event", sink.name()),
                Err(e) => match self.policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        error!("Sink '{}' failed: {}", sink.name(), e);
                        failures.push(SinkFailure {
                            sink: sink.name(),
                            error: e,
                        });
                    }
                },
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ThermoError::ChainFailed { failures })
        }
    }
}

impl std::fmt::Debug for LoggerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerChain")
            .field("sinks", &self.sink_names())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Iterator over the nodes of a [`LoggerChain`].
pub struct Nodes<'a> {
    node: Option<&'a LoggerChain>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a LoggerChain;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.next();
        Some(node)
    }
}
