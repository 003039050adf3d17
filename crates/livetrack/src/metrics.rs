use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Why an offered frame did not reach the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Capturing,
    Busy,
    ModelUnavailable,
    Throttled,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Capturing => "capturing",
            DropReason::Busy => "busy",
            DropReason::ModelUnavailable => "model_unavailable",
            DropReason::Throttled => "throttled",
        }
    }
}

/// Session instruments. No-ops until a meter provider is installed.
pub struct SessionMetrics {
    duration: Histogram<f64>,
    processed: Counter<u64>,
    dropped: Counter<u64>,
    failed: Counter<u64>,
    detections: Counter<u64>,
}

impl SessionMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.0005, 0.001, 0.002, 0.005, 0.01, 0.015, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2,
        ];

        Self {
            duration: meter
                .f64_histogram("livetrack_frame_duration_seconds")
                .with_description("Time to run inference and post-processing for one frame")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            processed: meter
                .u64_counter("livetrack_frames_processed_total")
                .with_description("Total frames processed")
                .build(),
            dropped: meter
                .u64_counter("livetrack_frames_dropped_total")
                .with_description("Total frames dropped before processing")
                .build(),
            failed: meter
                .u64_counter("livetrack_frames_failed_total")
                .with_description("Total frames skipped after an error")
                .build(),
            detections: meter
                .u64_counter("livetrack_detections_total")
                .with_description("Total detections emitted to the overlay")
                .build(),
        }
    }

    pub fn record_processed(&self, elapsed: Duration, detections: usize) {
        self.duration.record(elapsed.as_secs_f64(), &[]);
        self.processed.add(1, &[]);
        self.detections.add(detections as u64, &[]);
    }

    pub fn record_dropped(&self, reason: DropReason) {
        self.dropped
            .add(1, &[KeyValue::new("reason", reason.as_str())]);
    }

    pub fn record_failed(&self) {
        self.failed.add(1, &[]);
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new("livetrack")
    }
}
