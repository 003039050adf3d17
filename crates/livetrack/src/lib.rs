pub mod config;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod overlay;
pub mod pacing;
pub mod pipeline;
pub mod processing;
pub mod session;
pub mod tracking;
pub mod types;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use errors::EngineError;
pub use labels::{ClassInfo, LabelTable};
pub use overlay::{OverlayFrame, OverlayPublisher, OverlayReceiver, overlay_channel};
pub use pacing::FramePacer;
pub use pipeline::FramePipeline;
pub use processing::{RawCandidate, RawModelOutput};
pub use session::{CaptureSignal, DetectionModel, FrameOutcome, PreviewFrame, PreviewSession};
pub use tracking::{Track, TrackId, Tracker, TrackerParams, TrackerState};
pub use types::{Color, Detection, FrameDimensions};
