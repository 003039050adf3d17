use crate::errors::EngineError;
use crate::labels::LabelTable;
use crate::tracking::TrackerParams;
use common::env_or;
use std::time::Duration;

/// Engine tuning, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_detections: usize,
    pub confidence_threshold: f32,
    pub large_box_ratio: f32,
    pub large_box_min_confidence: f32,
    pub nms_iou_threshold: f32,
    pub max_per_label: usize,
    pub max_total: usize,
    pub match_iou: f32,
    pub add_threshold: f32,
    pub keep_threshold: f32,
    pub max_misses: u32,
    pub empty_streak_limit: u32,
    pub geometry_alpha: f32,
    pub confidence_alpha: f32,
    pub confidence_decay: f32,
    pub target_fps: u32,
    pub labels: LabelTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_detections: 10,
            confidence_threshold: 0.6,
            large_box_ratio: 0.5,
            large_box_min_confidence: 0.8,
            nms_iou_threshold: 0.5,
            max_per_label: 5,
            max_total: 5,
            match_iou: 0.4,
            add_threshold: 0.55,
            keep_threshold: 0.45,
            max_misses: 8,
            empty_streak_limit: 5,
            geometry_alpha: 0.6,
            confidence_alpha: 0.7,
            confidence_decay: 0.9,
            target_fps: 10,
            labels: LabelTable::coco(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `LIVETRACK_*` environment variables, falling
    /// back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        let config = Self {
            max_detections: env_or("LIVETRACK_MAX_DETECTIONS", d.max_detections),
            confidence_threshold: env_or("LIVETRACK_CONFIDENCE_THRESHOLD", d.confidence_threshold),
            large_box_ratio: env_or("LIVETRACK_LARGE_BOX_RATIO", d.large_box_ratio),
            large_box_min_confidence: env_or(
                "LIVETRACK_LARGE_BOX_MIN_CONFIDENCE",
                d.large_box_min_confidence,
            ),
            nms_iou_threshold: env_or("LIVETRACK_NMS_IOU_THRESHOLD", d.nms_iou_threshold),
            max_per_label: env_or("LIVETRACK_MAX_PER_LABEL", d.max_per_label),
            max_total: env_or("LIVETRACK_MAX_TOTAL", d.max_total),
            match_iou: env_or("LIVETRACK_MATCH_IOU", d.match_iou),
            add_threshold: env_or("LIVETRACK_ADD_THRESHOLD", d.add_threshold),
            keep_threshold: env_or("LIVETRACK_KEEP_THRESHOLD", d.keep_threshold),
            max_misses: env_or("LIVETRACK_MAX_MISSES", d.max_misses),
            empty_streak_limit: env_or("LIVETRACK_EMPTY_STREAK_LIMIT", d.empty_streak_limit),
            geometry_alpha: env_or("LIVETRACK_GEOMETRY_ALPHA", d.geometry_alpha),
            confidence_alpha: env_or("LIVETRACK_CONFIDENCE_ALPHA", d.confidence_alpha),
            confidence_decay: env_or("LIVETRACK_CONFIDENCE_DECAY", d.confidence_decay),
            target_fps: env_or("LIVETRACK_TARGET_FPS", d.target_fps),
            labels: d.labels,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let unit = [
            ("confidence_threshold", self.confidence_threshold),
            ("large_box_ratio", self.large_box_ratio),
            ("large_box_min_confidence", self.large_box_min_confidence),
            ("nms_iou_threshold", self.nms_iou_threshold),
            ("match_iou", self.match_iou),
            ("add_threshold", self.add_threshold),
            ("keep_threshold", self.keep_threshold),
            ("geometry_alpha", self.geometry_alpha),
            ("confidence_alpha", self.confidence_alpha),
            ("confidence_decay", self.confidence_decay),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.target_fps == 0 {
            return Err(EngineError::InvalidConfig(
                "target_fps must be positive".to_string(),
            ));
        }
        if self.max_detections == 0 || self.max_total == 0 || self.max_per_label == 0 {
            return Err(EngineError::InvalidConfig(
                "detection caps must be positive".to_string(),
            ));
        }
        if self.keep_threshold > self.add_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "keep_threshold {} exceeds add_threshold {}",
                self.keep_threshold, self.add_threshold
            )));
        }

        Ok(())
    }

    /// Per-frame processing budget at the target rate.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn tracker_params(&self) -> TrackerParams {
        TrackerParams {
            match_iou: self.match_iou,
            add_threshold: self.add_threshold,
            keep_threshold: self.keep_threshold,
            max_misses: self.max_misses,
            geometry_alpha: self.geometry_alpha,
            confidence_alpha: self.confidence_alpha,
            confidence_decay: self.confidence_decay,
            max_tracks: self.max_total,
            empty_streak_limit: self.empty_streak_limit,
        }
    }
}
