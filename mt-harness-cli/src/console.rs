//! Terminal visualizer
//!
//! Prints the port values of every instant and pauses so a replay can be
//! followed by eye.

use mt_harness::{format_sim_time, PortMap, Snapshot, Visualizer};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

pub struct ConsoleVisualizer<W: Write> {
    out: W,
    delay: Duration,
    frame: String,
}

impl ConsoleVisualizer<io::Stdout> {
    pub fn new(delay_ms: u64) -> Self {
        Self::with_writer(io::stdout(), delay_ms)
    }
}

impl<W: Write> ConsoleVisualizer<W> {
    pub fn with_writer(out: W, delay_ms: u64) -> Self {
        Self {
            out,
            delay: Duration::from_millis(delay_ms),
            frame: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn render_ports(label: &str, ports: &PortMap) -> String {
    let values: Vec<String> = ports
        .iter()
        .map(|(name, stream)| match stream.current_value() {
            Some(value) => format!("{}={}", name, value),
            None => format!("{}=-", name),
        })
        .collect();
    format!("  {:<8}{}", label, values.join("  "))
}

impl<W: Write> Visualizer for ConsoleVisualizer<W> {
    fn update(&mut self, snapshot: &Snapshot<'_>) {
        self.frame = format!(
            "[{}]\n{}\n{}\n",
            format_sim_time(snapshot.time()),
            render_ports("inputs", snapshot.inputs()),
            render_ports("outputs", snapshot.outputs())
        );
    }

    fn show(&mut self) {
        let written = self
            .out
            .write_all(self.frame.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            log::warn!("Visualizer output failed: {}", e);
        }

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_harness::{PortMap, Replay, StreamMonitor};

    fn port(name: &str, content: &'static str) -> (String, StreamMonitor) {
        let stream = StreamMonitor::from_reader(name, content.as_bytes(), false).unwrap();
        (name.to_string(), stream)
    }

    #[test]
    fn test_prints_one_frame_per_instant() {
        let inputs: PortMap = [port("in_ir1", "00:00:00 0\n00:00:01 1\n")].into_iter().collect();
        let outputs: PortMap = [port("out_alarm", "00:00:01 1\n")].into_iter().collect();
        let mut replay = Replay::new(inputs, outputs);

        let mut visualizer = ConsoleVisualizer::with_writer(Vec::new(), 0);
        while replay.step().unwrap().is_some() {
            visualizer.update(&replay.snapshot());
            visualizer.show();
        }

        let text = String::from_utf8(visualizer.into_inner()).unwrap();
        assert_eq!(
            text,
            "[00:00:00.000]\n  inputs  in_ir1=0\n  outputs out_alarm=-\n\
             [00:00:01.000]\n  inputs  in_ir1=1\n  outputs out_alarm=1\n"
        );
    }
}
