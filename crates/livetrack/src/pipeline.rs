use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::processing::{ClassMapper, ConfidenceFilter, RawModelOutput, Suppressor, TensorDecoder};
use crate::tracking::{Tracker, TrackerState};
use crate::types::{Detection, FrameDimensions};

/// The synchronous per-frame chain: decode, map classes, filter, suppress,
/// track.
pub struct FramePipeline {
    decoder: TensorDecoder,
    mapper: ClassMapper,
    filter: ConfidenceFilter,
    suppressor: Suppressor,
    tracker: Tracker,
}

impl FramePipeline {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        Ok(Self {
            decoder: TensorDecoder::new(config.max_detections),
            mapper: ClassMapper::new(config.labels.clone()),
            filter: ConfidenceFilter::new(
                config.confidence_threshold,
                config.large_box_ratio,
                config.large_box_min_confidence,
            ),
            suppressor: Suppressor::new(
                config.nms_iou_threshold,
                config.max_per_label,
                config.max_total,
            ),
            tracker: Tracker::new(config.tracker_params()),
        })
    }

    /// Stateless part of the chain: this frame's detections before tracking.
    pub fn detect(
        &self,
        output: &RawModelOutput,
        dims: FrameDimensions,
    ) -> Result<Vec<Detection>, EngineError> {
        if dims.is_empty() {
            return Err(EngineError::InvalidFrameDimensions {
                width: dims.width,
                height: dims.height,
            });
        }

        let raw = self.decoder.decode(output)?;
        let candidates = self.mapper.map(raw);
        let filtered = self.filter.apply(candidates, dims);
        Ok(self.suppressor.suppress(filtered))
    }

    /// Run the full chain against `state`. On error `state` is untouched and
    /// nothing is returned to commit.
    #[tracing::instrument(skip_all, fields(dims = %dims))]
    pub fn process(
        &self,
        state: &TrackerState,
        output: &RawModelOutput,
        dims: FrameDimensions,
    ) -> Result<(TrackerState, Vec<Detection>), EngineError> {
        let detections = self.detect(output, dims)?;
        let (next, emitted) = self.tracker.step(state, &detections);

        tracing::trace!(
            detected = detections.len(),
            tracks = next.tracks().len(),
            emitted = emitted.len(),
            "Frame processed"
        );

        Ok((next, emitted))
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
