use super::decode::RawCandidate;
use crate::labels::LabelTable;
use crate::types::Color;

/// A decoded row with its class resolved against the label table. The box is
/// still normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub color: Color,
    pub score: f32,
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
}

impl Candidate {
    /// Normalized area.
    pub fn area(&self) -> f32 {
        (self.xmax - self.xmin) * (self.ymax - self.ymin)
    }
}

pub struct ClassMapper {
    labels: LabelTable,
}

impl ClassMapper {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Unknown ids keep their candidate under a `Class {id}` label.
    pub fn map(&self, raw: Vec<RawCandidate>) -> Vec<Candidate> {
        raw.into_iter()
            .map(|c| {
                let info = self.labels.resolve(c.class_id);
                if info.index.is_none() {
                    tracing::trace!(class_id = c.class_id, "Unknown class id");
                }
                Candidate {
                    label: info.label,
                    color: info.color,
                    score: c.score,
                    ymin: c.ymin,
                    xmin: c.xmin,
                    ymax: c.ymax,
                    xmax: c.xmax,
                }
            })
            .collect()
    }
}
