use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::metrics::{DropReason, SessionMetrics};
use crate::overlay::{OverlayPublisher, OverlayReceiver, overlay_channel};
use crate::pacing::FramePacer;
use crate::pipeline::FramePipeline;
use crate::processing::RawModelOutput;
use crate::tracking::TrackerState;
use crate::types::FrameDimensions;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

const MAX_REMEMBERED_ERRORS: usize = 64;

/// Produces raw detector output for a camera frame.
pub trait DetectionModel: Send {
    type Frame;

    fn run(&mut self, frame: &Self::Frame) -> anyhow::Result<RawModelOutput>;
}

/// A camera frame as seen by the session.
pub trait PreviewFrame {
    fn dimensions(&self) -> FrameDimensions;
}

/// Shared "still capture in progress" flag. While set, frames are ignored and
/// tracker state is left alone.
#[derive(Debug, Clone, Default)]
pub struct CaptureSignal(Arc<AtomicBool>);

impl CaptureSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.0.store(capturing, Ordering::Release);
    }

    pub fn is_capturing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Capturing,
    /// Another frame is still being processed.
    Busy,
    ModelUnavailable,
    Throttled,
    /// The frame failed or has no size yet; previous state kept.
    Skipped,
    Processed { sequence: u64, emitted: usize },
}

/// Remembers recently seen error messages so each is logged once. The
/// oldest message is forgotten once `capacity` distinct ones are held.
#[derive(Debug)]
struct ErrorMemory {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ErrorMemory {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// True the first time `message` is seen while it is remembered.
    fn first_sighting(&mut self, message: &str) -> bool {
        if self.seen.contains(message) {
            return false;
        }
        if self.order.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        self.seen.insert(message.to_string());
        self.order.push_back(message.to_string());
        true
    }
}

struct SessionInner<M> {
    model: Option<M>,
    state: TrackerState,
    pacer: FramePacer,
    dims: Option<FrameDimensions>,
    publisher: OverlayPublisher,
    warned_missing_model: bool,
    logged_errors: ErrorMemory,
    frames_processed: u64,
    frames_failed: u64,
}

/// Per-frame entry point of a live preview. Owns the tracker state for the
/// lifetime of the preview.
pub struct PreviewSession<M> {
    inner: Mutex<SessionInner<M>>,
    pipeline: FramePipeline,
    capture: CaptureSignal,
    metrics: SessionMetrics,
    budget: Duration,
}

impl<M> PreviewSession<M>
where
    M: DetectionModel,
    M::Frame: PreviewFrame,
{
    /// Create a session with no model attached. Overlay updates arrive on the
    /// returned receiver.
    pub fn new(config: &EngineConfig) -> Result<(Self, OverlayReceiver), EngineError> {
        let pipeline = FramePipeline::new(config)?;
        let (publisher, receiver) = overlay_channel();

        let session = Self {
            inner: Mutex::new(SessionInner {
                model: None,
                state: TrackerState::default(),
                pacer: FramePacer::new(config.target_fps),
                dims: None,
                publisher,
                warned_missing_model: false,
                logged_errors: ErrorMemory::new(MAX_REMEMBERED_ERRORS),
                frames_processed: 0,
                frames_failed: 0,
            }),
            pipeline,
            capture: CaptureSignal::new(),
            metrics: SessionMetrics::default(),
            budget: config.frame_budget(),
        };

        Ok((session, receiver))
    }

    pub fn with_model(config: &EngineConfig, model: M) -> Result<(Self, OverlayReceiver), EngineError> {
        let (session, receiver) = Self::new(config)?;
        session.attach_model(model);
        Ok((session, receiver))
    }

    pub fn attach_model(&self, model: M) {
        let mut inner = self.lock();
        inner.model = Some(model);
        inner.warned_missing_model = false;
        tracing::info!("Detection model attached");
    }

    pub fn detach_model(&self) -> Option<M> {
        self.lock().model.take()
    }

    pub fn capture_signal(&self) -> CaptureSignal {
        self.capture.clone()
    }

    /// Handle one camera frame. Never blocks on a frame already in flight and
    /// never fails: every problem is folded into the outcome.
    pub fn on_frame(&self, frame: &M::Frame, now: Instant) -> FrameOutcome {
        if self.capture.is_capturing() {
            return self.dropped(DropReason::Capturing, FrameOutcome::Capturing);
        }

        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return self.dropped(DropReason::Busy, FrameOutcome::Busy);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        let inner = &mut *guard;

        let dims = match inner.dims {
            Some(dims) => dims,
            None => {
                let dims = frame.dimensions();
                if dims.is_empty() {
                    tracing::debug!(dims = %dims, "Frame has no size yet, skipping");
                    return FrameOutcome::Skipped;
                }
                inner.dims = Some(dims);
                inner.publisher.notify_dimensions(dims);
                tracing::info!(dims = %dims, "Frame dimensions established");
                dims
            }
        };

        let Some(model) = inner.model.as_mut() else {
            if !inner.warned_missing_model {
                tracing::warn!("Detection model not loaded yet, skipping frames");
                inner.warned_missing_model = true;
            }
            return self.dropped(DropReason::ModelUnavailable, FrameOutcome::ModelUnavailable);
        };

        if !inner.pacer.admit(now) {
            return self.dropped(DropReason::Throttled, FrameOutcome::Throttled);
        }

        let _span = common::span_debug!("session_frame", tracks = inner.state.tracks().len());
        let start = Instant::now();
        let result = model.run(frame).and_then(|output| {
            self.pipeline
                .process(&inner.state, &output, dims)
                .map_err(anyhow::Error::from)
        });

        match result {
            Ok((next, detections)) => {
                inner.state = next;
                inner.frames_processed += 1;
                let emitted = detections.len();
                let sequence = inner.publisher.publish(detections);

                let elapsed = start.elapsed();
                self.metrics.record_processed(elapsed, emitted);
                if elapsed > self.budget {
                    tracing::debug!(
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        budget_ms = self.budget.as_secs_f64() * 1000.0,
                        "Frame exceeded processing budget"
                    );
                }
                if inner.frames_processed.is_multiple_of(50) {
                    tracing::debug!(
                        frames_processed = inner.frames_processed,
                        frames_failed = inner.frames_failed,
                        tracks = inner.state.tracks().len(),
                        "Session status"
                    );
                }

                FrameOutcome::Processed { sequence, emitted }
            }
            Err(e) => {
                inner.frames_failed += 1;
                self.metrics.record_failed();

                let message = format!("{e:#}");
                if inner.logged_errors.first_sighting(&message) {
                    tracing::error!(error = %message, "Frame processing failed, skipping frame");
                } else {
                    tracing::trace!(error = %message, "Frame skipped");
                }

                FrameOutcome::Skipped
            }
        }
    }

    /// Copy of the current tracker state.
    pub fn tracker_state(&self) -> TrackerState {
        self.lock().state.clone()
    }

    pub fn frame_dimensions(&self) -> Option<FrameDimensions> {
        self.lock().dims
    }

    pub fn frames_processed(&self) -> u64 {
        self.lock().frames_processed
    }

    pub fn frames_failed(&self) -> u64 {
        self.lock().frames_failed
    }

    fn dropped(&self, reason: DropReason, outcome: FrameOutcome) -> FrameOutcome {
        self.metrics.record_dropped(reason);
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<M>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
