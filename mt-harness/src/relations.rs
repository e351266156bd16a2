//! Functional relations
//!
//! A relation is a named predicate over the port snapshot. Stateless
//! relations only see the snapshot; stateful ones also receive a memory value
//! that survives from one instant to the next within a test case.
//!
//! ```
//! use mt_harness::{ensure_relation, Relation, RelationSet};
//! use serde_json::json;
//!
//! let mut relations = RelationSet::new();
//! relations.add(
//!     "alarm_when_red_led",
//!     Relation::stateless(|snap| {
//!         if snap.number_output("out_e1l1")? == 1.0 {
//!             ensure_relation!(snap.number_output("out_alarm")? == 1.0);
//!         }
//!         Ok(())
//!     }),
//! );
//! relations.add(
//!     "steps_seen",
//!     Relation::stateful(|_snap, memory| {
//!         let seen = memory["steps"].as_u64().unwrap_or(0);
//!         Ok(Some(json!({ "steps": seen + 1 })))
//!     }),
//! );
//! assert_eq!(relations.len(), 2);
//! ```

use crate::snapshot::Snapshot;
use crate::types::{HarnessError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Memory carried by a stateful relation between instants
pub type Memory = Value;

type StatelessFn = dyn Fn(&Snapshot<'_>) -> Result<()>;
type StatefulFn = dyn Fn(&Snapshot<'_>, &Memory) -> Result<Option<Memory>>;

/// Fail the enclosing relation unless the condition holds
///
/// Without a message the stringified condition is reported.
#[macro_export]
macro_rules! ensure_relation {
    ($cond:expr $(,)?) => {
        if !$cond {
            return Err($crate::HarnessError::AssertionFailed(
                stringify!($cond).to_string(),
            ));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::HarnessError::AssertionFailed(format!($($arg)+)));
        }
    };
}

/// A correctness relation over the port snapshot
pub enum Relation {
    /// Predicate over the current snapshot only
    Stateless(Box<StatelessFn>),
    /// Predicate with memory; `Some(memory)` replaces the stored memory
    Stateful(Box<StatefulFn>),
}

impl Relation {
    pub fn stateless<F>(f: F) -> Self
    where
        F: Fn(&Snapshot<'_>) -> Result<()> + 'static,
    {
        Relation::Stateless(Box::new(f))
    }

    pub fn stateful<F>(f: F) -> Self
    where
        F: Fn(&Snapshot<'_>, &Memory) -> Result<Option<Memory>> + 'static,
    {
        Relation::Stateful(Box::new(f))
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, Relation::Stateful(_))
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Stateless(_) => write!(f, "Relation::Stateless"),
            Relation::Stateful(_) => write!(f, "Relation::Stateful"),
        }
    }
}

/// Per-test-case memory of the stateful relations, keyed by relation name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationMemory {
    slots: HashMap<String, Memory>,
}

impl RelationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory stored for a relation, if it has run at least once
    pub fn get(&self, relation: &str) -> Option<&Memory> {
        self.slots.get(relation)
    }

    fn slot(&mut self, relation: &str) -> &mut Memory {
        self.slots
            .entry(relation.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()))
    }
}

/// Named relations, evaluated in registration order
#[derive(Debug, Default)]
pub struct RelationSet {
    relations: Vec<(String, Relation)>,
}

impl RelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation; a relation with the same name is replaced in place
    pub fn add(&mut self, name: impl Into<String>, relation: Relation) -> &mut Self {
        let name = name.into();
        match self.relations.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = relation,
            None => self.relations.push((name, relation)),
        }
        self
    }

    /// Builder-style registration
    pub fn with(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.add(name, relation);
        self
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(|(name, _)| name.as_str())
    }

    /// Check every relation against the snapshot
    ///
    /// Stops at the first failing relation.
    pub fn evaluate(&self, snapshot: &Snapshot<'_>, memory: &mut RelationMemory) -> Result<()> {
        for (name, relation) in &self.relations {
            log::debug!(
                "Checking {} relation {}...",
                if relation.is_stateful() { "stateful" } else { "stateless" },
                name
            );

            let outcome = match relation {
                Relation::Stateless(f) => f(snapshot),
                Relation::Stateful(f) => {
                    let slot = memory.slot(name);
                    f(snapshot, slot).map(|next| {
                        if let Some(next) = next {
                            *slot = next;
                        }
                    })
                }
            };

            outcome.map_err(|e| violation(name, e))?;
        }
        Ok(())
    }
}

fn violation(relation: &str, error: HarnessError) -> HarnessError {
    match error {
        HarnessError::RelationViolated { .. } => error,
        other => HarnessError::RelationViolated {
            relation: relation.to_string(),
            reason: other.to_string(),
        },
    }
}
