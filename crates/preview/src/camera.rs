use crate::config::PreviewConfig;
use crate::recording::RecordedFrame;
use crate::replay::{ReplayFrame, ReplayModel};
use livetrack::{FrameOutcome, PreviewSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Per-outcome frame counts for one camera run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub frames: u64,
    pub processed: u64,
    pub throttled: u64,
    pub skipped: u64,
    pub busy: u64,
    pub model_unavailable: u64,
    pub capturing: u64,
}

impl CameraStats {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Processed { .. } => self.processed += 1,
            FrameOutcome::Throttled => self.throttled += 1,
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Busy => self.busy += 1,
            FrameOutcome::ModelUnavailable => self.model_unavailable += 1,
            FrameOutcome::Capturing => self.capturing += 1,
        }
    }
}

/// Feeds recorded frames to a session at camera rate, like a live preview
/// surface would.
pub struct ReplayCamera {
    frames: Vec<Arc<RecordedFrame>>,
    frame_duration: Duration,
    loop_recording: bool,
    model_warmup_frames: u64,
}

impl ReplayCamera {
    pub fn new(frames: Vec<RecordedFrame>, config: &PreviewConfig) -> Self {
        Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            frame_duration: config.frame_duration(),
            loop_recording: config.loop_recording,
            model_warmup_frames: config.model_warmup_frames,
        }
    }

    /// Run until the recording ends (or forever when looping) or `shutdown`
    /// is set. The model is attached once the warmup frames have gone by.
    pub fn run(
        &self,
        session: &PreviewSession<ReplayModel>,
        shutdown: &AtomicBool,
    ) -> anyhow::Result<CameraStats> {
        if self.frames.is_empty() {
            anyhow::bail!("Nothing to replay");
        }

        let _run = common::span!("replay_camera", looping = self.loop_recording);
        tracing::info!(
            frames = self.frames.len(),
            frame_duration = ?self.frame_duration,
            looping = self.loop_recording,
            "Starting replay camera"
        );

        let mut stats = CameraStats::default();
        let mut model_attached = false;
        let mut frame_number = 0u64;

        while !shutdown.load(Ordering::Relaxed) {
            if !self.loop_recording && frame_number >= self.frames.len() as u64 {
                break;
            }
            let index = (frame_number % self.frames.len() as u64) as usize;
            let start_time = Instant::now();

            if !model_attached && frame_number >= self.model_warmup_frames {
                session.attach_model(ReplayModel::new());
                model_attached = true;
            }

            let outcome = {
                let _span = common::span_debug!("camera_frame", frame = frame_number);
                let frame = ReplayFrame::new(frame_number, Arc::clone(&self.frames[index]));
                session.on_frame(&frame, start_time)
            };
            stats.record(outcome);
            frame_number += 1;

            if stats.frames.is_multiple_of(30) {
                tracing::debug!(
                    "Status: [Frames: {}] [Processed: {}] [Throttled: {}] [Skipped: {}] [No model: {}]",
                    stats.frames,
                    stats.processed,
                    stats.throttled,
                    stats.skipped,
                    stats.model_unavailable
                );
            }

            let elapsed = start_time.elapsed();
            if elapsed < self.frame_duration {
                std::thread::sleep(self.frame_duration - elapsed);
            } else {
                tracing::trace!("Frame handling took longer than camera interval: {:?}", elapsed);
            }
        }

        tracing::info!(
            "Shutdown: {} frames replayed, {} processed, {} skipped.",
            stats.frames,
            stats.processed,
            stats.skipped
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::parse_recording;
    use livetrack::EngineConfig;

    const PERSON: &str = r#"{"width":640,"height":480,"boxes":{"shape":[1,1,4],"data":[0.2,0.2,0.5,0.4]},"class_ids":{"shape":[1,1],"data":[1]},"scores":{"shape":[1,1],"data":[0.9]},"count":{"shape":[1],"data":[1]}}"#;

    fn camera(frames: usize, warmup: u64, looping: bool) -> ReplayCamera {
        let input = vec![PERSON; frames].join("\n");
        ReplayCamera {
            frames: parse_recording(input.as_bytes())
                .unwrap()
                .into_iter()
                .map(Arc::new)
                .collect(),
            frame_duration: Duration::from_millis(1),
            loop_recording: looping,
            model_warmup_frames: warmup,
        }
    }

    fn unthrottled() -> EngineConfig {
        EngineConfig {
            target_fps: 1000,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_replays_every_frame_once() {
        let (session, mut receiver) = PreviewSession::<ReplayModel>::new(&unthrottled()).unwrap();
        let shutdown = AtomicBool::new(false);

        let stats = camera(6, 2, false).run(&session, &shutdown).unwrap();

        assert_eq!(stats.frames, 6);
        assert_eq!(stats.model_unavailable, 2, "Warmup frames run without a model");
        assert_eq!(stats.processed + stats.throttled, 4);
        assert!(stats.processed >= 1);
        assert_eq!(receiver.try_latest().unwrap().detections[0].label, "person");
    }

    #[test]
    fn test_shutdown_stops_looping_camera() {
        let (session, _receiver) = PreviewSession::<ReplayModel>::new(&unthrottled()).unwrap();
        let shutdown = AtomicBool::new(true);

        let stats = camera(3, 0, true).run(&session, &shutdown).unwrap();
        assert_eq!(stats.frames, 0);
    }

    #[test]
    fn test_stats_record_outcomes() {
        let mut stats = CameraStats::default();
        stats.record(FrameOutcome::Processed {
            sequence: 0,
            emitted: 2,
        });
        stats.record(FrameOutcome::Throttled);
        stats.record(FrameOutcome::Capturing);

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.throttled, 1);
        assert_eq!(stats.capturing, 1);
    }
}
