use common::{env_opt, env_or};
use livetrack::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;

pub use common::Environment;

const DEFAULT_RECORDING: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/recordings/sample.jsonl");

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub environment: Environment,
    pub log_level: Option<String>,
    pub recording_path: PathBuf,
    pub camera_fps: f64,
    pub model_warmup_frames: u64,
    pub loop_recording: bool,
    pub otel_endpoint: Option<String>,
    pub engine: EngineConfig,
}

impl PreviewConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let recording_path = env_opt("RECORDING_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDING));

        let camera_fps: f64 = env_or("CAMERA_FPS", 30.0);
        if !(camera_fps.is_finite() && camera_fps > 0.0) {
            anyhow::bail!("CAMERA_FPS must be positive, got {}", camera_fps);
        }

        Ok(Self {
            environment,
            log_level: env_opt("LOG_LEVEL"),
            recording_path,
            camera_fps,
            model_warmup_frames: env_or("MODEL_WARMUP_FRAMES", 15),
            loop_recording: env_or("LOOP_RECORDING", false),
            otel_endpoint: env_opt("OTEL_ENDPOINT"),
            engine: EngineConfig::from_env()?,
        })
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.camera_fps)
    }
}
