//! Global timeline over a set of port streams
//!
//! The merger is the only clock in the harness: the next simulation instant is
//! always the earliest pending record among all streams, inputs and outputs
//! alike. `Replay` drives the streams through that timeline.

use crate::config::HarnessConfig;
use crate::monitor::StreamMonitor;
use crate::snapshot::{PortMap, Snapshot};
use crate::types::{PortKind, Result, SimTime};
use std::path::Path;

/// Earliest pending time among the non-exhausted streams
///
/// Returns None when every stream is exhausted or there are no streams.
pub fn next_event_time<'a, I>(streams: I) -> Option<SimTime>
where
    I: IntoIterator<Item = &'a StreamMonitor>,
{
    streams
        .into_iter()
        .filter(|s| !s.is_exhausted())
        .filter_map(|s| s.pending_time())
        .min()
}

/// Replay state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Running,
    Finished,
}

/// Event-driven replay of one test case's input and output streams
#[derive(Debug)]
pub struct Replay {
    inputs: PortMap,
    outputs: PortMap,
    state: ReplayState,
    now: Option<SimTime>,
}

impl Replay {
    /// Open every configured port log under the given directories
    pub fn open(config: &HarnessConfig, input_dir: &Path, output_dir: &Path) -> Result<Self> {
        let inputs = open_ports(PortKind::Input, &config.inputs, input_dir, config.multi_value)?;
        let outputs = open_ports(PortKind::Output, &config.outputs, output_dir, config.multi_value)?;
        Ok(Self::new(inputs, outputs))
    }

    /// Replay already-opened streams
    pub fn new(inputs: PortMap, outputs: PortMap) -> Self {
        Self {
            inputs,
            outputs,
            state: ReplayState::Running,
            now: None,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Time of the last executed instant
    pub fn now(&self) -> Option<SimTime> {
        self.now
    }

    /// Earliest pending time across inputs and outputs
    pub fn next_event_time(&self) -> Option<SimTime> {
        next_event_time(self.inputs.values().chain(self.outputs.values()))
    }

    /// Execute the next simulation instant
    ///
    /// Every stream due at that instant is advanced; the others keep their
    /// current value. Returns the instant, or None once the replay has
    /// finished.
    pub fn step(&mut self) -> Result<Option<SimTime>> {
        if self.state == ReplayState::Finished {
            return Ok(None);
        }

        let time = match self.next_event_time() {
            Some(time) => time,
            None => {
                self.state = ReplayState::Finished;
                return Ok(None);
            }
        };

        for stream in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            if stream.pending_time() == Some(time) {
                stream.advance()?;
            }
        }

        self.now = Some(time);
        Ok(Some(time))
    }

    /// View of the ports at the last executed instant
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(self.now.unwrap_or(0), &self.inputs, &self.outputs)
    }

    pub fn inputs(&self) -> &PortMap {
        &self.inputs
    }

    pub fn outputs(&self) -> &PortMap {
        &self.outputs
    }
}

fn open_ports(
    kind: PortKind,
    ports: &std::collections::BTreeMap<String, std::path::PathBuf>,
    dir: &Path,
    multi_value: bool,
) -> Result<PortMap> {
    ports
        .iter()
        .map(|(name, file)| {
            let stream = StreamMonitor::open(kind, name, &dir.join(file), multi_value)?;
            Ok((name.clone(), stream))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortValue;
    use std::io::Cursor;

    fn stream(name: &str, data: &'static str) -> (String, StreamMonitor) {
        (
            name.to_string(),
            StreamMonitor::from_reader(name, Cursor::new(data), false).unwrap(),
        )
    }

    #[test]
    fn test_merger_picks_earliest_pending() {
        let a = StreamMonitor::from_reader("a", Cursor::new("00:00:02 1\n"), false).unwrap();
        let b = StreamMonitor::from_reader("b", Cursor::new("00:00:01 1\n"), false).unwrap();
        let empty = StreamMonitor::from_reader("c", Cursor::new(""), false).unwrap();
        assert_eq!(next_event_time([&a, &b, &empty]), Some(1000));
    }

    #[test]
    fn test_merger_empty_and_exhausted() {
        assert_eq!(next_event_time(std::iter::empty::<&StreamMonitor>()), None);
        let empty = StreamMonitor::from_reader("c", Cursor::new(""), false).unwrap();
        assert_eq!(next_event_time([&empty]), None);
    }

    #[test]
    fn test_replay_visits_union_of_times() {
        let inputs: PortMap = [
            stream("a", "00:00:00:000 0\n00:00:00:100 1\n00:00:00:250 0\n"),
            stream("b", "00:00:00:000 5\n00:00:00:250 6\n"),
        ]
        .into_iter()
        .collect();
        let outputs: PortMap = [stream("y", "00:00:00:000 0\n00:00:00:150 1\n")]
            .into_iter()
            .collect();

        let mut replay = Replay::new(inputs, outputs);
        assert_eq!(replay.now(), None);
        let mut times = Vec::new();
        while let Some(t) = replay.step().unwrap() {
            assert_eq!(replay.now(), Some(t));
            times.push(t);
            if t == 150 {
                let snap = replay.snapshot();
                assert_eq!(snap.input("a"), Some(&PortValue::Number(1.0)));
                assert_eq!(snap.input("b"), Some(&PortValue::Number(5.0)));
                assert_eq!(snap.output("y"), Some(&PortValue::Number(1.0)));
            }
        }

        assert_eq!(times, vec![0, 100, 150, 250]);
        assert_eq!(replay.state(), ReplayState::Finished);
        assert_eq!(replay.now(), Some(250));
        assert_eq!(replay.step().unwrap(), None);
    }

    #[test]
    fn test_outputs_drive_the_clock() {
        let inputs: PortMap = [stream("a", "00:00:00 0\n")].into_iter().collect();
        let outputs: PortMap = [stream("y", "00:00:00 0\n00:00:05 1\n")].into_iter().collect();

        let mut replay = Replay::new(inputs, outputs);
        assert_eq!(replay.step().unwrap(), Some(0));
        assert_eq!(replay.step().unwrap(), Some(5000));
        assert_eq!(replay.step().unwrap(), None);
    }

    #[test]
    fn test_no_events() {
        let inputs: PortMap = [stream("a", "")].into_iter().collect();
        let mut replay = Replay::new(inputs, PortMap::new());
        assert_eq!(replay.step().unwrap(), None);
        assert_eq!(replay.state(), ReplayState::Finished);
    }
}
