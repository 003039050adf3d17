use crate::recording::RecordedFrame;
use livetrack::{DetectionModel, FrameDimensions, PreviewFrame, RawModelOutput};
use std::sync::Arc;

/// A camera frame replayed from a recording.
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    pub number: u64,
    recorded: Arc<RecordedFrame>,
}

impl ReplayFrame {
    pub fn new(number: u64, recorded: Arc<RecordedFrame>) -> Self {
        Self { number, recorded }
    }
}

impl PreviewFrame for ReplayFrame {
    fn dimensions(&self) -> FrameDimensions {
        self.recorded.dimensions()
    }
}

/// Stands in for the on-device detector: "inference" returns the tensors
/// recorded alongside the frame.
#[derive(Debug, Default)]
pub struct ReplayModel {
    runs: u64,
}

impl ReplayModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl DetectionModel for ReplayModel {
    type Frame = ReplayFrame;

    fn run(&mut self, frame: &ReplayFrame) -> anyhow::Result<RawModelOutput> {
        self.runs += 1;
        tracing::trace!(frame = frame.number, runs = self.runs, "Replaying model output");
        frame.recorded.to_output()
    }
}
