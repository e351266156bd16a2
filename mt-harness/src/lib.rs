//! Metamorphic Testing Harness Library
//!
//! Replays timestamped port logs recorded from a device (inputs and outputs)
//! and checks correctness relations between them at every simulation instant.
//!
//! # Architecture
//!
//! - `StreamMonitor` reads one port log lazily with a one-record lookahead
//! - The timeline merger picks the earliest pending record across all ports
//! - `Harness` advances every due port, snapshots the state, and checks
//!   functional relations (`RelationSet`) and relation files (`RuleSet`)
//! - Every instant is kept in a `History` for reporting
//!
//! The library does NOT:
//! - Simulate the device (outputs are replayed from logs, not computed)
//! - Pace the replay in real time
//! - Render anything (see the `Visualizer` hook)
//!
//! # Example Usage
//!
//! ```no_run
//! use mt_harness::{ensure_relation, Harness, HarnessConfig, Relation, RelationSet, TestCase};
//!
//! let config = HarnessConfig::new()
//!     .add_input("in_ir1", "A1_IR_1.txt")
//!     .add_output("out_r1l1", "D6_R1L1.txt")
//!     .add_output("out_alarm", "D13_ALARM.txt");
//!
//! let relations = RelationSet::new().with(
//!     "light_follows_ir",
//!     Relation::stateless(|snap| {
//!         if snap.number_output("out_alarm")? == 0.0 {
//!             ensure_relation!(snap.number_output("out_r1l1")? == snap.number_input("in_ir1")?);
//!         }
//!         Ok(())
//!     }),
//! );
//!
//! let mut harness = Harness::new(config);
//! let case = TestCase::new("sim1", "io/building/inputs", "io/building/outputs")
//!     .with_rules("building.rules");
//! let summary = harness.run_test_case(&case, &relations).unwrap();
//!
//! println!("{} instants checked", summary.steps);
//! println!("{} test cases recorded", harness.history().case_count());
//! ```

mod formats;

// Public modules
pub mod config;
pub mod harness;
pub mod history;
pub mod monitor;
pub mod relations;
pub mod rules;
pub mod snapshot;
pub mod timeline;
pub mod types;
pub mod visualizer;

// Re-export main types for convenience
pub use config::HarnessConfig;
pub use harness::{Harness, RunSummary, TestCase};
pub use history::{CaseHistory, History};
pub use monitor::StreamMonitor;
pub use relations::{Memory, Relation, RelationMemory, RelationSet};
pub use rules::{Rule, RuleSet};
pub use snapshot::{PortMap, PortValues, Sample, Snapshot};
pub use timeline::{next_event_time, Replay, ReplayState};
pub use types::{format_sim_time, HarnessError, PortKind, PortValue, Result, SimTime};
pub use visualizer::Visualizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
