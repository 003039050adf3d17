use std::time::{Duration, Instant};

/// Admits at most one frame per interval. Frames offered in between are
/// rejected, never queued.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    last_admitted: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
            last_admitted: None,
        }
    }

    /// Returns true and records `now` when at least one interval has passed
    /// since the last admitted frame.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last_admitted {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_admitted = Some(now);
                true
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}
