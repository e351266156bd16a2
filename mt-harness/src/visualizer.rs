//! Visualization hook
//!
//! The harness calls `update` and then `show` once per executed instant when
//! a visualizer is attached. Rendering is presentational only; nothing a
//! visualizer does feeds back into the replay.

use crate::snapshot::Snapshot;

pub trait Visualizer {
    /// Render the port state of the current instant
    fn update(&mut self, snapshot: &Snapshot<'_>);

    /// Flush the rendering, possibly pausing for the viewer
    fn show(&mut self);
}
