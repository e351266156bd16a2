//! Harness configuration types
//!
//! This module defines the port layout of the device under test: which input
//! and output ports exist and which log file records each of them. Test-case
//! directories are supplied per run, so one configuration serves many traces.

use crate::types::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Port layout of the device under test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Input ports: port name → log file name (relative to the input directory)
    #[serde(default)]
    pub inputs: BTreeMap<String, PathBuf>,

    /// Output ports: port name → log file name (relative to the output directory)
    #[serde(default)]
    pub outputs: BTreeMap<String, PathBuf>,

    /// Whether each record carries a whitespace-separated list of values
    #[serde(default)]
    pub multi_value: bool,
}

impl HarnessConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: bind an input port to a log file
    pub fn add_input(mut self, name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.inputs.insert(name.into(), file.into());
        self
    }

    /// Builder method: bind an output port to a log file
    pub fn add_output(mut self, name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.outputs.insert(name.into(), file.into());
        self
    }

    /// Builder method: enable or disable multi-value records
    pub fn with_multi_value(mut self, enabled: bool) -> Self {
        self.multi_value = enabled;
        self
    }

    /// Total number of configured ports
    pub fn port_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(HarnessError::NoInputsConfigured);
        }

        for name in self.inputs.keys().chain(self.outputs.keys()) {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(HarnessError::Config(format!(
                    "Port name {:?} must only use letters, digits, '_' and '-'",
                    name
                )));
            }
        }

        Ok(())
    }
}
