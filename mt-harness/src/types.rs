//! Core types for the replay harness
//!
//! This module defines the values carried by port streams, the simulation
//! clock type, and the error type shared by every part of the library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Simulation time in milliseconds since the start of the trace
pub type SimTime = u64;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Which side of the device a port belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Signal fed into the device under test
    Input,
    /// Signal produced by the device under test
    Output,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => write!(f, "in"),
            PortKind::Output => write!(f, "out"),
        }
    }
}

/// Errors that can occur while replaying traces and checking relations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Inputs not specified: at least one input port must be configured")]
    NoInputsConfigured,

    #[error("Failed to open {kind}:{port} log {path:?}: {source}")]
    PortOpen {
        kind: PortKind,
        port: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record at {time} ms in {port} is earlier than the previous record at {previous} ms")]
    OutOfOrderRecord {
        port: String,
        time: SimTime,
        previous: SimTime,
    },

    #[error("Unknown port {kind}:{name}")]
    UnknownPort { kind: PortKind, name: String },

    #[error("Port {kind}:{name} has no recorded value yet")]
    PortUnset { kind: PortKind, name: String },

    #[error("Relation '{relation}' violated: {reason}")]
    RelationViolated { relation: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Rule violated at line {line}: postcondition `{postcondition}` is false (precondition: `{}`)", .precondition.as_deref().unwrap_or("<always>"))]
    RuleViolated {
        line: usize,
        postcondition: String,
        precondition: Option<String>,
    },

    #[error("Failed to parse rule at line {line}: {message}")]
    RuleParse { line: usize, message: String },

    #[error("Failed to evaluate `{expression}`: {message}")]
    RuleEvaluation { expression: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A value recorded on a port
///
/// Numeric tokens become `Number`, anything else stays as `Text`. Ports read
/// in multi-value mode always hold a `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(f64),
    Text(String),
    List(Vec<PortValue>),
}

impl PortValue {
    /// Coerce a raw log token: numeric-looking tokens become floats
    pub fn from_token(token: &str) -> Self {
        match token.parse::<f64>() {
            Ok(v) => PortValue::Number(v),
            Err(_) => PortValue::Text(token.to_string()),
        }
    }

    /// Numeric view of the value (None for text and lists)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PortValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PortValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PortValue]> {
        match self {
            PortValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness: zero, empty text and empty lists are false
    pub fn is_truthy(&self) -> bool {
        match self {
            PortValue::Number(v) => *v != 0.0,
            PortValue::Text(s) => !s.is_empty(),
            PortValue::List(items) => !items.is_empty(),
        }
    }
}

impl From<f64> for PortValue {
    fn from(value: f64) -> Self {
        PortValue::Number(value)
    }
}

impl From<&str> for PortValue {
    fn from(value: &str) -> Self {
        PortValue::Text(value.to_string())
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Number(v) => write!(f, "{}", v),
            PortValue::Text(s) => write!(f, "{}", s),
            PortValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Format a simulation time as `HH:MM:SS.mmm`
pub fn format_sim_time(time: SimTime) -> String {
    let hours = time / 3_600_000;
    let minutes = (time / 60_000) % 60;
    let seconds = (time / 1_000) % 60;
    let millis = time % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
