use serde::Serialize;

/// Scores published after each processed frame.
///
/// Consumers treat this as an eventually-consistent monitoring signal: a
/// reader may observe a slightly stale value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotionSnapshot {
    /// Motion score from the last cycle that had a comparison basis.
    pub last_score: f64,
    /// Advisory score against the scene reference. Never thresholded here.
    pub scene_score: f64,
    /// `last_score > threshold` at the time `last_score` was produced.
    pub motion_detected: bool,
    /// Number of cycles that produced a motion score.
    pub frames_scored: u64,
}

/// Result of handing one frame to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ingest {
    /// Not recording; the frame was dropped without touching any state.
    Discarded,
    /// Frame stored, but neither `original` nor `previous` existed, so the
    /// motion fields carry their prior values.
    Observed(MotionSnapshot),
    /// A fresh motion score was produced.
    Scored(MotionSnapshot),
}

impl Ingest {
    pub fn snapshot(&self) -> Option<&MotionSnapshot> {
        match self {
            Ingest::Discarded => None,
            Ingest::Observed(s) | Ingest::Scored(s) => Some(s),
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Ingest::Scored(_))
    }
}
