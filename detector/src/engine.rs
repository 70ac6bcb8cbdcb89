use std::sync::Arc;

use frame_motion_common::config::EngineConfig;
use frame_motion_common::frame::{Frame, FrameView};
use image::RgbaImage;
use tracing::{debug, info};

use crate::luma::mean_luma_delta;
use crate::snapshot::{Ingest, MotionSnapshot};

/// Which slot a motion score was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Basis {
    Original,
    Previous,
}

impl Basis {
    fn as_str(self) -> &'static str {
        match self {
            Basis::Original => "original",
            Basis::Previous => "previous",
        }
    }
}

/// Frame difference engine.
///
/// Holds the reference frame slots and recording state, and turns each
/// incoming frame into a luminance-difference score plus a motion flag.
///
/// Slots:
/// - `latest`: last frame seen while recording, source for on-demand captures.
/// - `previous`: rolling comparison basis, cleared on every start/stop.
/// - `original`: sticky reference that takes priority over `previous`.
/// - `scene`: sticky reference for the advisory scene score.
/// - `tare_capture`: what `previous` held when `original` was last set.
///   Display only, never scored.
///
/// Every retained frame is an owned copy. Input frames are only borrowed.
pub struct FrameDiffEngine {
    threshold: f64,
    baseline: f64,
    recording: bool,
    latest: Option<Arc<Frame>>,
    previous: Option<Arc<Frame>>,
    original: Option<Arc<Frame>>,
    scene: Option<Arc<Frame>>,
    tare_capture: Option<Arc<Frame>>,
    /// Raw signed mean delta of the last motion comparison, for `tare`.
    last_raw_delta: Option<f64>,
    snapshot: MotionSnapshot,
}

impl FrameDiffEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.threshold,
            baseline: config.baseline,
            recording: config.start_recording,
            latest: None,
            previous: None,
            original: None,
            scene: None,
            tare_capture: None,
            last_raw_delta: None,
            snapshot: MotionSnapshot::default(),
        }
    }

    /// Process one frame from the capture layer.
    ///
    /// Frames arriving while not recording are discarded. Otherwise the
    /// frame becomes `latest`, the scene score is refreshed if a scene
    /// reference exists, the motion score is computed against `original`
    /// (or `previous` when no original is pinned), and finally the frame
    /// becomes `previous`.
    pub fn ingest(&mut self, frame: &FrameView<'_>) -> Ingest {
        if !self.recording {
            return Ingest::Discarded;
        }

        let owned = Arc::new(frame.to_owned_frame());
        self.latest = Some(Arc::clone(&owned));

        if let Some(scene) = &self.scene {
            self.snapshot.scene_score = self.score(scene, frame).unwrap_or(0.0);
        }

        let basis = match (&self.original, &self.previous) {
            (Some(original), _) => Some((Basis::Original, Arc::clone(original))),
            (None, Some(previous)) => Some((Basis::Previous, Arc::clone(previous))),
            (None, None) => None,
        };

        let scored = match basis {
            Some((basis, reference)) => {
                let raw = mean_luma_delta(&reference.view(), frame);
                self.last_raw_delta = raw.or(self.last_raw_delta);
                let score = raw
                    .map(|mean| (mean - self.baseline).abs())
                    .unwrap_or(0.0)
                    .max(0.0);

                self.snapshot.last_score = score;
                self.snapshot.motion_detected = score > self.threshold;
                self.snapshot.frames_scored += 1;
                debug!(
                    basis = basis.as_str(),
                    score = format!("{:.4}", score),
                    threshold = format!("{:.4}", self.threshold),
                    scene_score = format!("{:.4}", self.snapshot.scene_score),
                    motion = self.snapshot.motion_detected,
                    "frame scored"
                );
                true
            }
            None => {
                debug!("no comparison basis yet, frame observed");
                false
            }
        };

        self.previous = Some(owned);

        if scored {
            Ingest::Scored(self.snapshot)
        } else {
            Ingest::Observed(self.snapshot)
        }
    }

    fn score(&self, reference: &Frame, frame: &FrameView<'_>) -> Option<f64> {
        mean_luma_delta(&reference.view(), frame).map(|mean| (mean - self.baseline).abs())
    }

    // -- Reference slots ---------------------------------------------------------

    /// Pin `frame` as the original reference.
    ///
    /// Whatever `previous` held right before this call is kept as the
    /// tare capture, so the operator can see what was live when pinning.
    pub fn set_original_reference(&mut self, frame: &FrameView<'_>) {
        self.pin_original(Arc::new(frame.to_owned_frame()));
    }

    /// Pin the most recent frame as the original reference.
    ///
    /// Returns `false` when no frame has been seen yet.
    pub fn capture_original_reference(&mut self) -> bool {
        match self.latest.clone() {
            Some(latest) => {
                self.pin_original(latest);
                true
            }
            None => false,
        }
    }

    fn pin_original(&mut self, frame: Arc<Frame>) {
        self.tare_capture = self.previous.clone();
        info!(
            width = frame.width(),
            height = frame.height(),
            tare_captured = self.tare_capture.is_some(),
            "original reference set"
        );
        self.original = Some(frame);
    }

    /// Drop the original reference; scoring falls back to `previous`.
    pub fn clear_original_reference(&mut self) {
        if self.original.take().is_some() {
            info!("original reference cleared");
        }
    }

    /// Store an explicit frame as the scene reference.
    pub fn set_scene_reference(&mut self, frame: &FrameView<'_>) {
        self.scene = Some(Arc::new(frame.to_owned_frame()));
        info!("scene reference set");
    }

    /// Capture the most recent frame as the scene reference.
    ///
    /// Returns `false` when no frame has been seen yet.
    pub fn capture_scene_reference(&mut self) -> bool {
        match &self.latest {
            Some(latest) => {
                self.scene = Some(Arc::clone(latest));
                info!("scene reference captured from latest frame");
                true
            }
            None => false,
        }
    }

    pub fn clear_scene_reference(&mut self) {
        if self.scene.take().is_some() {
            info!("scene reference cleared");
        }
    }

    pub fn clear_tare_capture(&mut self) {
        self.tare_capture = None;
    }

    // -- Recording -----------------------------------------------------------------

    /// Start processing frames. Clears `previous` so no comparison spans
    /// two recording sessions.
    pub fn start_recording(&mut self) {
        self.recording = true;
        self.previous = None;
        info!(has_original = self.original.is_some(), "recording started");
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
        self.previous = None;
        info!("recording stopped");
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    // -- Configuration -------------------------------------------------------------

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn set_baseline(&mut self, baseline: f64) {
        self.baseline = baseline;
    }

    /// Calibrate: adopt the raw mean delta of the last motion comparison as
    /// the baseline, cancelling a static lighting or sensor bias.
    ///
    /// Returns the new baseline, or `None` if nothing has been compared yet.
    pub fn tare(&mut self) -> Option<f64> {
        let raw = self.last_raw_delta?;
        self.baseline = raw;
        info!(baseline = format!("{:.4}", raw), "baseline tared");
        Some(raw)
    }

    // -- Accessors -----------------------------------------------------------------

    pub fn snapshot(&self) -> MotionSnapshot {
        self.snapshot
    }

    pub fn has_original(&self) -> bool {
        self.original.is_some()
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.latest.as_deref()
    }

    pub fn original(&self) -> Option<&Frame> {
        self.original.as_deref()
    }

    pub fn tare_capture(&self) -> Option<&Frame> {
        self.tare_capture.as_deref()
    }

    pub fn original_image(&self) -> Option<RgbaImage> {
        self.original.as_ref().and_then(|f| f.to_rgba_image())
    }

    pub fn tare_image(&self) -> Option<RgbaImage> {
        self.tare_capture.as_ref().and_then(|f| f.to_rgba_image())
    }
}
