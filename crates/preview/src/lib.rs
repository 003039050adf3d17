pub mod camera;
pub mod config;
pub mod logging;
pub mod overlay_log;
pub mod recording;
pub mod replay;

pub use camera::{CameraStats, ReplayCamera};
pub use config::PreviewConfig;
pub use overlay_log::{OverlaySummary, spawn_overlay_logger};
pub use recording::{RecordedFrame, TensorRecord, load_recording};
pub use replay::{ReplayFrame, ReplayModel};
