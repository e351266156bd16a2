//! Port stream monitor
//!
//! A `StreamMonitor` lazily reads one port log and exposes a two-slot view of
//! it: the value in effect at the current instant, and the next record that
//! has not been applied yet. Records sharing a timestamp collapse into the
//! last one, so a stream never exposes two different values for one instant.

use crate::formats::{Record, RecordParser, RecordReader};
use crate::types::{HarnessError, PortKind, PortValue, Result, SimTime};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Replay state of a single port log
pub struct StreamMonitor {
    name: String,
    path: Option<PathBuf>,
    records: RecordReader<Box<dyn BufRead>>,

    current_time: Option<SimTime>,
    current_value: Option<PortValue>,

    pending: Option<Record>,
    last_read: Option<SimTime>,
    exhausted: bool,
}

impl StreamMonitor {
    /// Open a port log file and read its first record into the lookahead
    pub fn open(kind: PortKind, name: &str, path: &Path, multi_value: bool) -> Result<Self> {
        log::debug!("Opening {}:{} from {:?}", kind, name, path);

        let file = File::open(path).map_err(|source| HarnessError::PortOpen {
            kind,
            port: name.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

        let mut monitor = Self::build(name, Box::new(BufReader::new(file)), multi_value)?;
        monitor.path = Some(path.to_path_buf());
        Ok(monitor)
    }

    /// Monitor an arbitrary buffered reader (in-memory logs, pipes)
    pub fn from_reader<R>(name: &str, reader: R, multi_value: bool) -> Result<Self>
    where
        R: BufRead + 'static,
    {
        Self::build(name, Box::new(reader), multi_value)
    }

    fn build(name: &str, reader: Box<dyn BufRead>, multi_value: bool) -> Result<Self> {
        let parser = RecordParser::new(multi_value)?;
        let mut monitor = Self {
            name: name.to_string(),
            path: None,
            records: RecordReader::new(reader, parser, name),
            current_time: None,
            current_value: None,
            pending: None,
            last_read: None,
            exhausted: false,
        };

        // Prime the lookahead; nothing is current until the first event fires
        monitor.advance()?;
        Ok(monitor)
    }

    /// Apply the pending record and read ahead to the next distinct timestamp
    ///
    /// No-op once the stream is exhausted. Records carrying the same timestamp
    /// as the one just applied overwrite the current value in place.
    pub fn advance(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }

        if let Some(record) = self.pending.take() {
            self.current_time = Some(record.time);
            self.current_value = Some(record.value);
        }

        loop {
            let record = match self.records.next() {
                Some(record) => record?,
                None => {
                    self.pending = None;
                    self.exhausted = true;
                    log::debug!("Port {} exhausted", self.name);
                    return Ok(());
                }
            };

            if let Some(previous) = self.last_read {
                if record.time < previous {
                    return Err(HarnessError::OutOfOrderRecord {
                        port: self.name.clone(),
                        time: record.time,
                        previous,
                    });
                }
            }
            self.last_read = Some(record.time);

            if self.current_time == Some(record.time) {
                self.current_value = Some(record.value);
                continue;
            }

            self.pending = Some(record);
            return Ok(());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the underlying log, if the stream was opened from a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Time of the value currently in effect
    pub fn current_time(&self) -> Option<SimTime> {
        self.current_time
    }

    /// Value in effect at the current instant (None before the first event)
    pub fn current_value(&self) -> Option<&PortValue> {
        self.current_value.as_ref()
    }

    /// Time of the next record not yet applied
    pub fn pending_time(&self) -> Option<SimTime> {
        self.pending.as_ref().map(|r| r.time)
    }

    pub fn pending_value(&self) -> Option<&PortValue> {
        self.pending.as_ref().map(|r| &r.value)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl fmt::Debug for StreamMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamMonitor")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("current_time", &self.current_time)
            .field("current_value", &self.current_value)
            .field("pending", &self.pending)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
