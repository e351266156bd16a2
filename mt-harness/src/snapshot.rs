//! Read-only view of the port state at one simulation instant
//!
//! The orchestrator owns the streams; relations, rules and visualizers only
//! ever see them through a `Snapshot`.

use crate::monitor::StreamMonitor;
use crate::types::{HarnessError, PortKind, PortValue, Result, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Port name → stream
pub type PortMap = BTreeMap<String, StreamMonitor>;

/// Port name → value at one instant (None if the port has no value yet)
pub type PortValues = BTreeMap<String, Option<PortValue>>;

/// Borrowed view of every port at the current instant
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    time: SimTime,
    inputs: &'a PortMap,
    outputs: &'a PortMap,
}

impl<'a> Snapshot<'a> {
    pub fn new(time: SimTime, inputs: &'a PortMap, outputs: &'a PortMap) -> Self {
        Self {
            time,
            inputs,
            outputs,
        }
    }

    /// Simulation time of this instant
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn inputs(&self) -> &'a PortMap {
        self.inputs
    }

    pub fn outputs(&self) -> &'a PortMap {
        self.outputs
    }

    pub fn ports(&self, kind: PortKind) -> &'a PortMap {
        match kind {
            PortKind::Input => self.inputs,
            PortKind::Output => self.outputs,
        }
    }

    /// Stream backing a port
    pub fn stream(&self, kind: PortKind, name: &str) -> Option<&'a StreamMonitor> {
        self.ports(kind).get(name)
    }

    /// Current value of a port (None for unknown ports and ports without a value yet)
    pub fn value(&self, kind: PortKind, name: &str) -> Option<&'a PortValue> {
        self.stream(kind, name).and_then(|s| s.current_value())
    }

    pub fn input(&self, name: &str) -> Option<&'a PortValue> {
        self.value(PortKind::Input, name)
    }

    pub fn output(&self, name: &str) -> Option<&'a PortValue> {
        self.value(PortKind::Output, name)
    }

    /// Current value of a port, failing for unknown or unset ports
    pub fn require(&self, kind: PortKind, name: &str) -> Result<&'a PortValue> {
        let stream = self.stream(kind, name).ok_or_else(|| HarnessError::UnknownPort {
            kind,
            name: name.to_string(),
        })?;
        stream.current_value().ok_or_else(|| HarnessError::PortUnset {
            kind,
            name: name.to_string(),
        })
    }

    pub fn require_input(&self, name: &str) -> Result<&'a PortValue> {
        self.require(PortKind::Input, name)
    }

    pub fn require_output(&self, name: &str) -> Result<&'a PortValue> {
        self.require(PortKind::Output, name)
    }

    /// Numeric value of an input port
    pub fn number_input(&self, name: &str) -> Result<f64> {
        Self::number(PortKind::Input, name, self.require_input(name)?)
    }

    /// Numeric value of an output port
    pub fn number_output(&self, name: &str) -> Result<f64> {
        Self::number(PortKind::Output, name, self.require_output(name)?)
    }

    fn number(kind: PortKind, name: &str, value: &PortValue) -> Result<f64> {
        value.as_f64().ok_or_else(|| {
            HarnessError::AssertionFailed(format!(
                "port {}:{} holds non-numeric value {}",
                kind, name, value
            ))
        })
    }

    /// Owned copy of every port value, as recorded in the history
    pub fn sample(&self) -> Sample {
        Sample {
            inputs: collect_values(self.inputs),
            outputs: collect_values(self.outputs),
        }
    }
}

fn collect_values(ports: &PortMap) -> PortValues {
    ports
        .iter()
        .map(|(name, stream)| (name.clone(), stream.current_value().cloned()))
        .collect()
}

/// Port values at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub inputs: PortValues,
    pub outputs: PortValues,
}
