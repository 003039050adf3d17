use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender, bounded};
use livetrack::{
    DetectionModel, EngineConfig, FrameDimensions, FrameOutcome, PreviewFrame, PreviewSession,
    RawModelOutput,
};
use ndarray::{Array, IxDyn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct TestFrame;

impl PreviewFrame for TestFrame {
    fn dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(1080, 1920)
    }
}

fn person_output() -> RawModelOutput {
    RawModelOutput::new(
        Array::from_shape_vec(IxDyn(&[1, 1, 4]), vec![0.2, 0.2, 0.5, 0.6]).unwrap(),
        Array::from_shape_vec(IxDyn(&[1, 1]), vec![1.0]).unwrap(),
        Array::from_shape_vec(IxDyn(&[1, 1]), vec![0.9]).unwrap(),
        Array::from_shape_vec(IxDyn(&[1]), vec![1.0]).unwrap(),
    )
}

fn malformed_output() -> RawModelOutput {
    RawModelOutput::new(
        Array::from_shape_vec(IxDyn(&[2, 3]), vec![0.0; 6]).unwrap(),
        Array::from_shape_vec(IxDyn(&[2]), vec![1.0, 1.0]).unwrap(),
        Array::from_shape_vec(IxDyn(&[2]), vec![0.9, 0.9]).unwrap(),
        Array::from_shape_vec(IxDyn(&[1]), vec![2.0]).unwrap(),
    )
}

/// Replays a fixed script of results, then reports nothing.
struct ScriptedModel {
    script: VecDeque<anyhow::Result<RawModelOutput>>,
}

impl ScriptedModel {
    fn new(script: Vec<anyhow::Result<RawModelOutput>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl DetectionModel for ScriptedModel {
    type Frame = TestFrame;

    fn run(&mut self, _frame: &TestFrame) -> anyhow::Result<RawModelOutput> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(RawModelOutput::empty()))
    }
}

/// Drives frames 100 ms apart so every one passes the 10 fps pacer.
struct Clock {
    now: Instant,
}

impl Clock {
    fn new() -> Self {
        Self {
            now: Instant::now(),
        }
    }

    fn tick(&mut self) -> Instant {
        self.now += Duration::from_millis(100);
        self.now
    }
}

/// Tests:
/// - Inference errors and malformed tensors skip the frame
/// - Tracker state is left exactly as before a skipped frame
/// - The next good frame continues the same track
#[test]
fn test_failed_frames_leave_state_untouched() {
    let model = ScriptedModel::new(vec![
        Ok(person_output()),
        Err(anyhow!("inference engine unavailable")),
        Err(anyhow!("inference engine unavailable")),
        Ok(malformed_output()),
        Ok(person_output()),
    ]);
    let (session, _receiver) = PreviewSession::with_model(&EngineConfig::default(), model).unwrap();
    let mut clock = Clock::new();

    // TEST 1: first frame spawns a track
    assert!(matches!(
        session.on_frame(&TestFrame, clock.tick()),
        FrameOutcome::Processed { emitted: 1, .. }
    ));
    let before = session.tracker_state();

    // TEST 2: two inference failures and one malformed tensor
    for _ in 0..3 {
        assert_eq!(session.on_frame(&TestFrame, clock.tick()), FrameOutcome::Skipped);
        assert_eq!(session.tracker_state(), before, "Skipped frame must not touch state");
    }
    assert_eq!(session.frames_failed(), 3);

    // TEST 3: recovery keeps the track identity and resets misses
    session.on_frame(&TestFrame, clock.tick());
    let after = session.tracker_state();
    assert_eq!(after.tracks().len(), 1);
    assert_eq!(after.tracks()[0].id, before.tracks()[0].id);
    assert_eq!(after.tracks()[0].misses, 0);
    assert_eq!(session.frames_processed(), 2);
}

#[test]
fn test_capture_pause_preserves_tracks() {
    let model = ScriptedModel::new(vec![Ok(person_output()), Ok(person_output())]);
    let (session, mut receiver) = PreviewSession::with_model(&EngineConfig::default(), model).unwrap();
    let mut clock = Clock::new();
    let capture = session.capture_signal();

    session.on_frame(&TestFrame, clock.tick());
    let id = session.tracker_state().tracks()[0].id;
    let before_pause = receiver.try_latest().unwrap().detections.clone();

    capture.set_capturing(true);
    for _ in 0..20 {
        assert_eq!(session.on_frame(&TestFrame, clock.tick()), FrameOutcome::Capturing);
    }
    assert_eq!(session.tracker_state().tracks()[0].misses, 0);
    assert!(receiver.try_latest().is_none(), "No overlay updates while capturing");
    assert_eq!(receiver.snapshot(), before_pause);

    capture.set_capturing(false);
    session.on_frame(&TestFrame, clock.tick());
    assert_eq!(session.tracker_state().tracks()[0].id, id);
    assert_eq!(receiver.try_latest().unwrap().sequence, 1);
}

/// Blocks inside `run` until released, so a second frame can arrive while the
/// first is in flight.
struct GatedModel {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl DetectionModel for GatedModel {
    type Frame = TestFrame;

    fn run(&mut self, _frame: &TestFrame) -> anyhow::Result<RawModelOutput> {
        self.entered.send(())?;
        self.release.recv()?;
        Ok(person_output())
    }
}

#[test]
fn test_overlapping_frame_is_dropped_not_queued() {
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let model = GatedModel {
        entered: entered_tx,
        release: release_rx,
    };
    let (session, _receiver) = PreviewSession::with_model(&EngineConfig::default(), model).unwrap();
    let session = Arc::new(session);

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.on_frame(&TestFrame, Instant::now()))
    };

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        session.on_frame(&TestFrame, Instant::now() + Duration::from_secs(1)),
        FrameOutcome::Busy
    );

    release_tx.send(()).unwrap();
    assert!(matches!(worker.join().unwrap(), FrameOutcome::Processed { .. }));
    assert_eq!(session.frames_processed(), 1);
}

#[test]
fn test_camera_rate_throttled_to_target() {
    let script = (0..100).map(|_| Ok(person_output())).collect();
    let (session, _receiver) =
        PreviewSession::with_model(&EngineConfig::default(), ScriptedModel::new(script)).unwrap();
    let start = Instant::now();

    // Two seconds of a 30 fps camera
    let outcomes: Vec<_> = (0..60u64)
        .map(|i| session.on_frame(&TestFrame, start + Duration::from_micros(i * 33_334)))
        .collect();

    let processed = outcomes
        .iter()
        .filter(|o| matches!(o, FrameOutcome::Processed { .. }))
        .count();
    let throttled = outcomes
        .iter()
        .filter(|o| **o == FrameOutcome::Throttled)
        .count();
    assert_eq!(processed, 20);
    assert_eq!(throttled, 40);
}

#[test]
fn test_overlay_consumer_sees_latest_update() {
    let script = (0..10).map(|_| Ok(person_output())).collect();
    let (session, mut receiver) =
        PreviewSession::with_model(&EngineConfig::default(), ScriptedModel::new(script)).unwrap();
    let mut clock = Clock::new();

    for _ in 0..10 {
        session.on_frame(&TestFrame, clock.tick());
    }

    let consumer = thread::spawn(move || {
        let frame = receiver.recv_timeout(Duration::from_secs(1)).unwrap().clone();
        (frame, receiver.frame_dimensions())
    });
    let (frame, dims) = consumer.join().unwrap();

    assert_eq!(frame.sequence, 9);
    assert_eq!(frame.detections.len(), 1);
    assert_eq!(frame.detections[0].label, "person");
    assert_eq!(dims, Some(FrameDimensions::new(1080, 1920)));
}

#[test]
fn test_model_attached_late() {
    let (session, receiver) = PreviewSession::<ScriptedModel>::new(&EngineConfig::default()).unwrap();
    let mut clock = Clock::new();

    for _ in 0..5 {
        assert_eq!(
            session.on_frame(&TestFrame, clock.tick()),
            FrameOutcome::ModelUnavailable
        );
    }
    assert_eq!(receiver.frame_dimensions(), Some(FrameDimensions::new(1080, 1920)));

    session.attach_model(ScriptedModel::new(vec![Ok(person_output())]));
    assert_eq!(
        session.on_frame(&TestFrame, clock.tick()),
        FrameOutcome::Processed {
            sequence: 0,
            emitted: 1
        }
    );
}
