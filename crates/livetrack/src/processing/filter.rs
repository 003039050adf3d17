use super::classify::Candidate;
use crate::types::{Detection, FrameDimensions};

pub struct ConfidenceFilter {
    pub threshold: f32,
    pub large_box_ratio: f32,
    pub large_box_min_confidence: f32,
}

impl ConfidenceFilter {
    pub fn new(threshold: f32, large_box_ratio: f32, large_box_min_confidence: f32) -> Self {
        Self {
            threshold,
            large_box_ratio,
            large_box_min_confidence,
        }
    }

    /// Keep candidates at or above the threshold and scale them to screen
    /// pixels. Boxes covering more than `large_box_ratio` of the frame need
    /// `large_box_min_confidence` to survive.
    #[tracing::instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn apply(&self, candidates: Vec<Candidate>, dims: FrameDimensions) -> Vec<Detection> {
        let frame_w = dims.width as f32;
        let frame_h = dims.height as f32;
        let large_area = self.large_box_ratio * dims.area();

        candidates
            .into_iter()
            .filter(|c| c.score >= self.threshold)
            .filter_map(|c| {
                let x = c.xmin * frame_w;
                let y = c.ymin * frame_h;
                let width = (c.xmax - c.xmin) * frame_w;
                let height = (c.ymax - c.ymin) * frame_h;

                if width * height > large_area && c.score < self.large_box_min_confidence {
                    tracing::trace!(label = %c.label, score = c.score, "Dropping oversized box");
                    return None;
                }

                Some(Detection {
                    label: c.label,
                    confidence: c.score,
                    x,
                    y,
                    width,
                    height,
                    color: c.color,
                })
            })
            .collect()
    }
}
