use crate::types::Detection;
use std::collections::BTreeMap;

/// Per-label greedy non-maximum suppression.
pub struct Suppressor {
    pub iou_threshold: f32,
    pub max_per_label: usize,
    pub max_total: usize,
}

impl Suppressor {
    pub fn new(iou_threshold: f32, max_per_label: usize, max_total: usize) -> Self {
        Self {
            iou_threshold,
            max_per_label,
            max_total,
        }
    }

    #[tracing::instrument(skip_all, fields(detections = detections.len()))]
    pub fn suppress(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut groups: BTreeMap<String, Vec<Detection>> = BTreeMap::new();
        for detection in detections {
            groups
                .entry(detection.label.clone())
                .or_default()
                .push(detection);
        }

        let mut kept = Vec::new();
        for (_, mut group) in groups {
            sort_by_confidence(&mut group);

            let mut accepted: Vec<Detection> = Vec::with_capacity(self.max_per_label);
            for candidate in group {
                if accepted.len() >= self.max_per_label {
                    break;
                }
                if accepted
                    .iter()
                    .all(|a| a.iou(&candidate) <= self.iou_threshold)
                {
                    accepted.push(candidate);
                }
            }
            kept.extend(accepted);
        }

        sort_by_confidence(&mut kept);
        kept.truncate(self.max_total);
        kept
    }
}

/// Stable descending sort by confidence.
fn sort_by_confidence(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}
