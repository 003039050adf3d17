use super::fallback::EmptyStreakFallback;
use crate::types::Detection;
use std::fmt;

/// Session-unique track identity, assigned on spawn and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub detection: Detection,
    pub misses: u32,
}

/// Everything the tracker carries from one frame to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    tracks: Vec<Track>,
    next_id: u64,
    fallback: EmptyStreakFallback,
}

impl TrackerState {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn fallback(&self) -> &EmptyStreakFallback {
        &self.fallback
    }

    fn spawn(&mut self, detection: Detection) -> Track {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        Track {
            id,
            detection,
            misses: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerParams {
    pub match_iou: f32,
    pub add_threshold: f32,
    pub keep_threshold: f32,
    pub max_misses: u32,
    pub geometry_alpha: f32,
    pub confidence_alpha: f32,
    pub confidence_decay: f32,
    pub max_tracks: usize,
    pub empty_streak_limit: u32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            match_iou: 0.4,
            add_threshold: 0.55,
            keep_threshold: 0.45,
            max_misses: 8,
            geometry_alpha: 0.6,
            confidence_alpha: 0.7,
            confidence_decay: 0.9,
            max_tracks: 5,
            empty_streak_limit: 5,
        }
    }
}

/// Hysteresis tracker. Holds only parameters; all cross-frame data lives in
/// [`TrackerState`].
pub struct Tracker {
    params: TrackerParams,
}

impl Tracker {
    pub fn new(params: TrackerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Advance one frame. `state` is left untouched; the caller commits the
    /// returned state once the frame is known to be good.
    #[tracing::instrument(skip_all, fields(tracks = state.tracks.len(), detections = detections.len()))]
    pub fn step(&self, state: &TrackerState, detections: &[Detection]) -> (TrackerState, Vec<Detection>) {
        let p = &self.params;
        let mut next = state.clone();
        let mut claimed = vec![false; detections.len()];
        let mut tracks = Vec::with_capacity(state.tracks.len() + detections.len());

        for track in &state.tracks {
            let mut best_iou = 0.0;
            let mut best = None;
            for (i, candidate) in detections.iter().enumerate() {
                if claimed[i] || candidate.label != track.detection.label {
                    continue;
                }
                let overlap = track.detection.iou(candidate);
                if overlap > best_iou {
                    best_iou = overlap;
                    best = Some(i);
                }
            }

            match best {
                Some(i) if best_iou >= p.match_iou => {
                    claimed[i] = true;
                    tracks.push(Track {
                        id: track.id,
                        detection: self.blend(&track.detection, &detections[i]),
                        misses: 0,
                    });
                }
                _ => tracks.push(Track {
                    misses: track.misses + 1,
                    ..track.clone()
                }),
            }
        }

        for (i, candidate) in detections.iter().enumerate() {
            if !claimed[i] && candidate.confidence >= p.add_threshold {
                let track = next.spawn(candidate.clone());
                tracing::debug!(id = %track.id, label = %candidate.label, "Track spawned");
                tracks.push(track);
            }
        }

        tracks.retain(|t| {
            let keep = t.misses <= p.max_misses;
            if !keep {
                tracing::debug!(id = %t.id, label = %t.detection.label, "Track expired");
            }
            keep
        });
        tracks.sort_by(|a, b| b.detection.confidence.total_cmp(&a.detection.confidence));
        tracks.truncate(p.max_tracks);

        let output = tracks.iter().map(|t| t.detection.clone()).collect();
        next.tracks = tracks;

        let output = next.fallback.resolve(output, p.empty_streak_limit);
        (next, output)
    }

    /// Smooth a matched track toward its candidate. The candidate's label and
    /// color replace the track's.
    fn blend(&self, prev: &Detection, candidate: &Detection) -> Detection {
        let p = &self.params;
        let ema = |cand: f32, prev: f32, alpha: f32| alpha * cand + (1.0 - alpha) * prev;

        let target = if candidate.confidence >= p.keep_threshold
            || candidate.confidence >= p.add_threshold
        {
            candidate.confidence
        } else {
            candidate.confidence.max(prev.confidence * p.confidence_decay)
        };

        Detection {
            label: candidate.label.clone(),
            confidence: ema(target, prev.confidence, p.confidence_alpha).clamp(0.0, 1.0),
            x: ema(candidate.x, prev.x, p.geometry_alpha),
            y: ema(candidate.y, prev.y, p.geometry_alpha),
            width: ema(candidate.width, prev.width, p.geometry_alpha),
            height: ema(candidate.height, prev.height, p.geometry_alpha),
            color: candidate.color,
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, detection};

    fn run(tracker: &Tracker, state: TrackerState, detections: &[Detection]) -> (TrackerState, Vec<Detection>) {
        tracker.step(&state, detections)
    }

    #[test]
    fn test_confident_detection_spawns_track() {
        let tracker = Tracker::default();
        let (state, out) = run(&tracker, TrackerState::default(), &[detection("person", 0.9, 10.0, 10.0, 50.0, 80.0)]);

        assert_eq!(state.tracks().len(), 1);
        assert_eq!(state.tracks()[0].id, TrackId(0));
        assert_eq!(state.tracks()[0].misses, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn test_weak_detection_does_not_spawn() {
        let tracker = Tracker::default();
        let (state, out) = run(&tracker, TrackerState::default(), &[detection("person", 0.5, 10.0, 10.0, 50.0, 80.0)]);

        assert!(state.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_match_smooths_geometry_and_confidence() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("person", 0.8, 100.0, 100.0, 50.0, 50.0)]);
        let (state, out) = run(&tracker, state, &[detection("person", 0.6, 110.0, 100.0, 50.0, 50.0)]);

        let track = &state.tracks()[0];
        assert_eq!(track.id, TrackId(0), "Match must keep the track identity");
        // x = 0.6 * 110 + 0.4 * 100
        assert!((out[0].x - 106.0).abs() < 1e-4);
        assert!((out[0].y - 100.0).abs() < 1e-4);
        // target 0.6 (>= add), conf = 0.7 * 0.6 + 0.3 * 0.8
        assert!((out[0].confidence - 0.66).abs() < 1e-5);
    }

    #[test]
    fn test_hysteresis_floor_below_keep() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("dog", 0.9, 0.0, 0.0, 100.0, 100.0)]);
        let prev = state.tracks()[0].detection.confidence;

        let (state, out) = run(&tracker, state, &[detection("dog", 0.1, 0.0, 0.0, 100.0, 100.0)]);
        let now = out[0].confidence;

        assert_eq!(state.tracks()[0].misses, 0);
        assert!(now >= 0.9 * prev, "Confidence {} fell below 0.9 x {}", now, prev);
        // target = max(0.1, 0.81) = 0.81; 0.7 * 0.81 + 0.3 * 0.9
        assert!((now - 0.837).abs() < 1e-5);
    }

    #[test]
    fn test_candidate_between_keep_and_add_used_directly() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("dog", 0.6, 0.0, 0.0, 100.0, 100.0)]);
        let (_, out) = run(&tracker, state, &[detection("dog", 0.5, 0.0, 0.0, 100.0, 100.0)]);

        // 0.5 >= keep, so target is 0.5 even though 0.6 * 0.9 = 0.54 is higher
        assert!((out[0].confidence - (0.7 * 0.5 + 0.3 * 0.6)).abs() < 1e-5);
    }

    #[test]
    fn test_matched_track_takes_candidate_color() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("cup", 0.9, 0.0, 0.0, 40.0, 40.0)]);

        let mut recolored = detection("cup", 0.9, 0.0, 0.0, 40.0, 40.0);
        recolored.color = Color::rgb(0x2A, 0x7D, 0xE1);
        let (_, out) = run(&tracker, state, &[recolored]);

        assert_eq!(out[0].color, Color::rgb(0x2A, 0x7D, 0xE1));
    }

    #[test]
    fn test_label_mismatch_never_matches() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("cat", 0.9, 0.0, 0.0, 40.0, 40.0)]);
        let (state, _) = run(&tracker, state, &[detection("dog", 0.9, 0.0, 0.0, 40.0, 40.0)]);

        let tracks = state.tracks();
        assert_eq!(tracks.len(), 2);
        let cat = tracks.iter().find(|t| t.detection.label == "cat").unwrap();
        assert_eq!(cat.misses, 1);
        assert_eq!(tracks.iter().find(|t| t.detection.label == "dog").unwrap().id, TrackId(1));
    }

    #[test]
    fn test_low_overlap_is_not_a_match() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("car", 0.9, 0.0, 0.0, 100.0, 100.0)]);
        // IoU 1/3 < 0.4
        let (state, _) = run(&tracker, state, &[detection("car", 0.9, 50.0, 0.0, 100.0, 100.0)]);

        assert_eq!(state.tracks().len(), 2);
        assert_eq!(state.tracks().iter().filter(|t| t.misses == 1).count(), 1);
    }

    #[test]
    fn test_detection_claimed_by_one_track_only() {
        let tracker = Tracker::default();
        let (state, _) = run(
            &tracker,
            TrackerState::default(),
            &[
                detection("person", 0.9, 0.0, 0.0, 100.0, 100.0),
                detection("person", 0.8, 40.0, 0.0, 100.0, 100.0),
            ],
        );
        assert_eq!(state.tracks().len(), 2);

        let (state, _) = run(&tracker, state, &[detection("person", 0.9, 20.0, 0.0, 100.0, 100.0)]);
        assert_eq!(state.tracks().iter().filter(|t| t.misses == 0).count(), 1);
        assert_eq!(state.tracks().iter().filter(|t| t.misses == 1).count(), 1);
    }

    #[test]
    fn test_track_expires_after_max_misses() {
        let tracker = Tracker::default();
        let (mut state, _) = run(&tracker, TrackerState::default(), &[detection("bird", 0.9, 5.0, 5.0, 10.0, 10.0)]);

        for frame in 1..=8 {
            state = run(&tracker, state, &[]).0;
            assert_eq!(state.tracks().len(), 1, "Track should survive miss {}", frame);
            assert_eq!(state.tracks()[0].misses, frame);
        }

        state = run(&tracker, state, &[]).0;
        assert!(state.is_empty(), "Track should be gone after nine misses");
    }

    #[test]
    fn test_track_list_capped_by_confidence() {
        let tracker = Tracker::default();
        let detections: Vec<_> = (0..7)
            .map(|i| detection("car", 0.6 + i as f32 * 0.05, i as f32 * 100.0, 0.0, 50.0, 50.0))
            .collect();

        let (state, out) = run(&tracker, TrackerState::default(), &detections);
        assert_eq!(state.tracks().len(), 5);
        assert_eq!(out.len(), 5);
        assert!(out.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!((out[4].confidence - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_track_ids_never_reused() {
        let tracker = Tracker::default();
        let (mut state, _) = run(&tracker, TrackerState::default(), &[detection("cup", 0.9, 0.0, 0.0, 10.0, 10.0)]);
        for _ in 0..9 {
            state = run(&tracker, state, &[]).0;
        }
        assert!(state.is_empty());

        let (state, _) = run(&tracker, state, &[detection("cup", 0.9, 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(state.tracks()[0].id, TrackId(1));
    }

    #[test]
    fn test_step_does_not_mutate_input_state() {
        let tracker = Tracker::default();
        let (state, _) = run(&tracker, TrackerState::default(), &[detection("cup", 0.9, 0.0, 0.0, 10.0, 10.0)]);
        let before = state.clone();

        let _ = tracker.step(&state, &[]);
        assert_eq!(state, before);
    }
}
