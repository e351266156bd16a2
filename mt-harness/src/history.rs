//! Recorded port values per test case
//!
//! Every executed instant of every test case is kept for the lifetime of the
//! harness so runs can be reported on or compared afterwards.

use crate::snapshot::Sample;
use crate::types::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instants of one test case, ordered by simulation time
pub type CaseHistory = BTreeMap<SimTime, Sample>;

/// Append-only store of recorded samples, keyed by test-case id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    cases: BTreeMap<String, CaseHistory>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test case so it appears even if it records no instant
    pub fn begin_case(&mut self, case: &str) {
        self.cases.entry(case.to_string()).or_default();
    }

    /// Record the port values of one instant; a repeated time overwrites
    pub fn record(&mut self, case: &str, time: SimTime, sample: Sample) {
        self.cases
            .entry(case.to_string())
            .or_default()
            .insert(time, sample);
    }

    /// All instants of a test case
    pub fn case(&self, case: &str) -> Option<&CaseHistory> {
        self.cases.get(case)
    }

    /// Port values of a test case at one instant
    pub fn sample(&self, case: &str, time: SimTime) -> Option<&Sample> {
        self.cases.get(case).and_then(|c| c.get(&time))
    }

    pub fn cases(&self) -> impl Iterator<Item = (&str, &CaseHistory)> {
        self.cases.iter().map(|(id, h)| (id.as_str(), h))
    }

    /// Number of recorded test cases
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Number of recorded instants of one test case
    pub fn instant_count(&self, case: &str) -> usize {
        self.cases.get(case).map(|c| c.len()).unwrap_or(0)
    }

    /// Number of recorded instants across all test cases
    pub fn total_instants(&self) -> usize {
        self.cases.values().map(|c| c.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortValue;

    fn sample(v: f64) -> Sample {
        Sample {
            inputs: [("a".to_string(), Some(PortValue::Number(v)))].into_iter().collect(),
            outputs: BTreeMap::new(),
        }
    }

    #[test]
    fn test_record_and_query() {
        let mut history = History::new();
        history.record("sim1", 100, sample(1.0));
        history.record("sim1", 0, sample(0.0));
        history.record("sim2", 50, sample(5.0));

        assert_eq!(history.case_count(), 2);
        assert_eq!(history.instant_count("sim1"), 2);
        assert_eq!(history.total_instants(), 3);

        let times: Vec<SimTime> = history.case("sim1").unwrap().keys().copied().collect();
        assert_eq!(times, vec![0, 100]);
        assert_eq!(history.sample("sim2", 50), Some(&sample(5.0)));
    }

    #[test]
    fn test_same_time_overwrites() {
        let mut history = History::new();
        history.record("sim1", 100, sample(1.0));
        history.record("sim1", 100, sample(2.0));
        assert_eq!(history.instant_count("sim1"), 1);
        assert_eq!(history.sample("sim1", 100), Some(&sample(2.0)));
    }

    #[test]
    fn test_empty_case_is_listed() {
        let mut history = History::new();
        history.begin_case("empty");
        assert_eq!(history.case_count(), 1);
        assert_eq!(history.instant_count("empty"), 0);
    }
}
