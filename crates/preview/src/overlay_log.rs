use crossbeam_channel::RecvTimeoutError;
use livetrack::{Detection, OverlayReceiver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default)]
pub struct OverlaySummary {
    pub updates: u64,
    pub last_sequence: Option<u64>,
    /// What a still capture taken at shutdown would have contained.
    pub snapshot: Vec<Detection>,
}

/// Stand-in for the overlay renderer: drains updates on its own thread and
/// logs whenever the set of visible labels changes.
pub fn spawn_overlay_logger(
    mut receiver: OverlayReceiver,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<OverlaySummary> {
    thread::spawn(move || {
        let mut summary = OverlaySummary::default();
        let mut dims_logged = false;
        let mut visible: Vec<String> = Vec::new();

        while !shutdown.load(Ordering::Relaxed) {
            let frame = match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            summary.updates += 1;
            summary.last_sequence = Some(frame.sequence);

            let labels: Vec<String> = frame.detections.iter().map(|d| d.label.clone()).collect();
            if labels != visible {
                tracing::info!(
                    sequence = frame.sequence,
                    labels = ?labels,
                    "Overlay changed"
                );
                visible = labels;
            }

            for d in &frame.detections {
                tracing::trace!(
                    label = %d.label,
                    confidence = d.confidence,
                    x = d.x,
                    y = d.y,
                    width = d.width,
                    height = d.height,
                    color = %d.color,
                    "Overlay box"
                );
            }

            if !dims_logged && let Some(dims) = receiver.frame_dimensions() {
                tracing::info!(dims = %dims, "Overlay surface sized");
                dims_logged = true;
            }
        }

        summary.snapshot = receiver.snapshot();
        summary
    })
}
