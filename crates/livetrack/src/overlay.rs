use crate::types::{Detection, FrameDimensions};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// One overlay update. Sequence numbers increase by one per published frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub sequence: u64,
    pub detections: Vec<Detection>,
}

/// Single-slot "latest value" handoff from the processing thread to the
/// overlay. Publishing never blocks: an unread frame is replaced.
pub fn overlay_channel() -> (OverlayPublisher, OverlayReceiver) {
    let (tx, rx) = bounded(1);
    let dimensions = Arc::new(OnceLock::new());

    let publisher = OverlayPublisher {
        tx,
        evict: rx.clone(),
        next_sequence: 0,
        dimensions: Arc::clone(&dimensions),
    };
    let receiver = OverlayReceiver {
        rx,
        dimensions,
        latest: None,
        last_non_empty: Vec::new(),
    };

    (publisher, receiver)
}

pub struct OverlayPublisher {
    tx: Sender<OverlayFrame>,
    evict: Receiver<OverlayFrame>,
    next_sequence: u64,
    dimensions: Arc<OnceLock<FrameDimensions>>,
}

impl OverlayPublisher {
    /// Returns the sequence number assigned to this update.
    ///
    /// The publisher holds its own handle on the slot, so the channel never
    /// disconnects: after the overlay receiver is dropped each publish simply
    /// replaces the previous unread frame.
    pub fn publish(&mut self, detections: Vec<Detection>) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let mut frame = OverlayFrame {
            sequence,
            detections,
        };
        while let Err(TrySendError::Full(rejected)) = self.tx.try_send(frame) {
            if let Ok(stale) = self.evict.try_recv() {
                tracing::trace!(sequence = stale.sequence, "Replacing unread overlay frame");
            }
            frame = rejected;
        }

        sequence
    }

    /// Record the frame dimensions. Only the first call has any effect;
    /// returns whether it was this one.
    pub fn notify_dimensions(&self, dims: FrameDimensions) -> bool {
        self.dimensions.set(dims).is_ok()
    }

    pub fn dimensions(&self) -> Option<FrameDimensions> {
        self.dimensions.get().copied()
    }
}

pub struct OverlayReceiver {
    rx: Receiver<OverlayFrame>,
    dimensions: Arc<OnceLock<FrameDimensions>>,
    latest: Option<OverlayFrame>,
    last_non_empty: Vec<Detection>,
}

impl OverlayReceiver {
    /// Take the pending update, if any.
    pub fn try_latest(&mut self) -> Option<&OverlayFrame> {
        let frame = self.rx.try_recv().ok()?;
        Some(self.remember(frame))
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<&OverlayFrame, RecvTimeoutError> {
        let frame = self.rx.recv_timeout(timeout)?;
        Ok(self.remember(frame))
    }

    fn remember(&mut self, frame: OverlayFrame) -> &OverlayFrame {
        if !frame.detections.is_empty() {
            self.last_non_empty.clone_from(&frame.detections);
        }
        self.latest.insert(frame)
    }

    /// Most recently received update.
    pub fn latest(&self) -> Option<&OverlayFrame> {
        self.latest.as_ref()
    }

    /// Detections for a still capture: the latest update, or the last
    /// non-empty one when the latest is empty.
    pub fn snapshot(&self) -> Vec<Detection> {
        match &self.latest {
            Some(frame) if !frame.detections.is_empty() => frame.detections.clone(),
            _ => self.last_non_empty.clone(),
        }
    }

    pub fn frame_dimensions(&self) -> Option<FrameDimensions> {
        self.dimensions.get().copied()
    }
}
