//! Test-case runner
//!
//! The `Harness` replays the port logs of a test case instant by instant and
//! checks every functional relation and textual rule at each instant. The
//! first violation aborts the test case and is returned to the caller.

use crate::config::HarnessConfig;
use crate::history::History;
use crate::relations::{RelationMemory, RelationSet};
use crate::rules::RuleSet;
use crate::snapshot::{PortValues, Snapshot};
use crate::timeline::Replay;
use crate::types::{format_sim_time, HarnessError, Result, SimTime};
use crate::visualizer::Visualizer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the logs of one test case live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Identifier used as the history key
    pub id: String,
    /// Directory holding the input port logs
    pub input_dir: PathBuf,
    /// Directory holding the output port logs
    pub output_dir: PathBuf,
    /// Optional relation file checked alongside the functional relations
    #[serde(default)]
    pub rules: Option<PathBuf>,
}

impl TestCase {
    pub fn new(
        id: impl Into<String>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            rules: None,
        }
    }

    /// Builder method: attach a relation file
    pub fn with_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules = Some(path.into());
        self
    }
}

/// Outcome of a completed test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub test_case: String,
    /// Number of executed instants
    pub steps: usize,
    pub first_time: Option<SimTime>,
    pub last_time: Option<SimTime>,
}

impl RunSummary {
    fn new(test_case: &str) -> Self {
        Self {
            test_case: test_case.to_string(),
            steps: 0,
            first_time: None,
            last_time: None,
        }
    }

    fn observe(&mut self, time: SimTime) {
        self.steps += 1;
        self.first_time.get_or_insert(time);
        self.last_time = Some(time);
    }
}

/// Replays test cases of one device and keeps their history
pub struct Harness {
    config: HarnessConfig,
    visualizer: Option<Box<dyn Visualizer>>,
    history: History,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            visualizer: None,
            history: History::new(),
        }
    }

    /// Builder method: render every instant through a visualizer
    pub fn with_visualizer(mut self, visualizer: Box<dyn Visualizer>) -> Self {
        self.visualizer = Some(visualizer);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Samples recorded by every test case run so far
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run a test case from the log files in its directories
    ///
    /// Streams and relation memory are fresh for every call; only the
    /// history is shared between test cases.
    pub fn run_test_case(&mut self, case: &TestCase, relations: &RelationSet) -> Result<RunSummary> {
        self.config.validate()?;

        let rules = match &case.rules {
            Some(path) => {
                let rules = RuleSet::load(path)?;
                rules.check_ports(&self.config)?;
                Some(rules)
            }
            None => None,
        };

        let replay = Replay::open(&self.config, &case.input_dir, &case.output_dir)?;
        self.run_replay(&case.id, replay, relations, rules.as_ref())
    }

    /// Run a test case from logs stored in one directory, with an optional rule set
    pub fn run_dir(
        &mut self,
        id: &str,
        dir: &Path,
        relations: &RelationSet,
        rules: Option<&RuleSet>,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        if let Some(rules) = rules {
            rules.check_ports(&self.config)?;
        }
        let replay = Replay::open(&self.config, dir, dir)?;
        self.run_replay(id, replay, relations, rules)
    }

    /// Drive an already-opened replay to completion
    pub fn run_replay(
        &mut self,
        id: &str,
        mut replay: Replay,
        relations: &RelationSet,
        rules: Option<&RuleSet>,
    ) -> Result<RunSummary> {
        if replay.inputs().is_empty() {
            return Err(HarnessError::NoInputsConfigured);
        }

        log::info!(
            "Running test case {} ({} inputs, {} outputs, {} relations, {} rules)",
            id,
            replay.inputs().len(),
            replay.outputs().len(),
            relations.len(),
            rules.map(|r| r.len()).unwrap_or(0)
        );

        self.history.begin_case(id);
        let mut memory = RelationMemory::new();
        let mut summary = RunSummary::new(id);

        while let Some(time) = replay.step()? {
            log::debug!("Executing simulation time {}", format_sim_time(time));

            let snapshot = replay.snapshot();
            let sample = snapshot.sample();
            log::debug!("Inputs: {}", describe(&sample.inputs));
            log::debug!("Outputs: {}", describe(&sample.outputs));
            self.history.record(id, time, sample);

            if let Some(visualizer) = self.visualizer.as_mut() {
                visualizer.update(&snapshot);
                visualizer.show();
            }

            if let Err(e) = check_instant(&snapshot, relations, &mut memory, rules) {
                log::error!(
                    "Test case {} failed at {}: {}",
                    id,
                    format_sim_time(time),
                    e
                );
                return Err(e);
            }

            summary.observe(time);
        }

        log::info!("Test case {} passed: {} instants checked", id, summary.steps);
        Ok(summary)
    }
}

fn check_instant(
    snapshot: &Snapshot<'_>,
    relations: &RelationSet,
    memory: &mut RelationMemory,
    rules: Option<&RuleSet>,
) -> Result<()> {
    relations.evaluate(snapshot, memory)?;
    if let Some(rules) = rules {
        rules.evaluate(snapshot)?;
    }
    Ok(())
}

fn describe(values: &PortValues) -> String {
    values
        .iter()
        .map(|(name, value)| match value {
            Some(v) => format!("{}={}", name, v),
            None => format!("{}=None", name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
