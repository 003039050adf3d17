mod fallback;
mod tracker;

pub use fallback::EmptyStreakFallback;
pub use tracker::{Track, TrackId, Tracker, TrackerParams, TrackerState};
