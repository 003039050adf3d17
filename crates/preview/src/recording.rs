use anyhow::{Context, Result};
use livetrack::{FrameDimensions, RawModelOutput};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A tensor as stored on disk: row-major data plus its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorRecord {
    pub fn to_array(&self) -> Result<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone()).with_context(|| {
            format!(
                "Tensor data of length {} does not fit shape {:?}",
                self.data.len(),
                self.shape
            )
        })
    }
}

/// One recorded camera frame: preview size plus the raw detector outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub width: u32,
    pub height: u32,
    pub boxes: TensorRecord,
    pub class_ids: TensorRecord,
    pub scores: TensorRecord,
    pub count: TensorRecord,
}

impl RecordedFrame {
    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(self.width, self.height)
    }

    pub fn to_output(&self) -> Result<RawModelOutput> {
        Ok(RawModelOutput::new(
            self.boxes.to_array().context("boxes")?,
            self.class_ids.to_array().context("class_ids")?,
            self.scores.to_array().context("scores")?,
            self.count.to_array().context("count")?,
        ))
    }
}

/// Parse a JSON-lines recording. Blank lines and `#` comments are skipped.
pub fn parse_recording(reader: impl BufRead) -> Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let frame: RecordedFrame = serde_json::from_str(line)
            .with_context(|| format!("Invalid recorded frame on line {}", index + 1))?;
        frames.push(frame);
    }

    Ok(frames)
}

pub fn load_recording(path: &Path) -> Result<Vec<RecordedFrame>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open recording {}", path.display()))?;
    let frames = parse_recording(BufReader::new(file))?;

    if frames.is_empty() {
        anyhow::bail!("Recording {} contains no frames", path.display());
    }

    tracing::info!(
        path = %path.display(),
        frames = frames.len(),
        "Recording loaded"
    );
    Ok(frames)
}
