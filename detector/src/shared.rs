use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use frame_motion_common::config::EngineConfig;
use frame_motion_common::frame::FrameView;
use tokio::sync::watch;
use tracing::debug;

use crate::engine::FrameDiffEngine;
use crate::snapshot::{Ingest, MotionSnapshot};

/// Thread-safe handle to a [`FrameDiffEngine`].
///
/// The capture worker and the control surface share one engine behind a
/// mutex, so a control call can never interleave with an in-flight ingest.
/// Results go out through a watch channel: subscribers only ever see the
/// newest snapshot, older ones are overwritten rather than queued.
#[derive(Clone)]
pub struct SharedEngine {
    engine: Arc<Mutex<FrameDiffEngine>>,
    publisher: Arc<watch::Sender<MotionSnapshot>>,
}

impl SharedEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::from_engine(FrameDiffEngine::new(config))
    }

    pub fn from_engine(engine: FrameDiffEngine) -> Self {
        let (tx, _rx) = watch::channel(engine.snapshot());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            publisher: Arc::new(tx),
        }
    }

    /// Receiver that always yields the most recent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MotionSnapshot> {
        self.publisher.subscribe()
    }

    /// Ingest under the lock, then publish if the frame was processed.
    pub fn ingest(&self, frame: &FrameView<'_>) -> Ingest {
        let outcome = self.lock().ingest(frame);
        if let Some(snapshot) = outcome.snapshot() {
            let snapshot = *snapshot;
            self.publisher.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot;
                    true
                }
            });
        } else {
            debug!("frame discarded, not recording");
        }
        outcome
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut FrameDiffEngine) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        self.lock().snapshot()
    }

    pub fn start_recording(&self) {
        self.lock().start_recording();
    }

    pub fn stop_recording(&self) {
        self.lock().stop_recording();
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_recording()
    }

    pub fn capture_original_reference(&self) -> bool {
        self.lock().capture_original_reference()
    }

    pub fn clear_original_reference(&self) {
        self.lock().clear_original_reference();
    }

    pub fn capture_scene_reference(&self) -> bool {
        self.lock().capture_scene_reference()
    }

    pub fn clear_scene_reference(&self) {
        self.lock().clear_scene_reference();
    }

    pub fn clear_tare_capture(&self) {
        self.lock().clear_tare_capture();
    }

    pub fn tare(&self) -> Option<f64> {
        self.lock().tare()
    }

    pub fn set_threshold(&self, threshold: f64) {
        self.lock().set_threshold(threshold);
    }

    pub fn set_baseline(&self, baseline: f64) {
        self.lock().set_baseline(baseline);
    }

    // A panic mid-ingest leaves the engine in a consistent state (slots are
    // only ever replaced wholesale), so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, FrameDiffEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_motion_common::frame::Frame;
    use std::time::Duration;

    fn gray(v: u8) -> Frame {
        Frame::solid(16, 16, 64, [v, v, v, 255]).unwrap()
    }

    fn recording() -> SharedEngine {
        SharedEngine::new(&EngineConfig {
            threshold: 5.0,
            start_recording: true,
            ..EngineConfig::default()
        })
    }

    #[tokio::test]
    async fn subscriber_sees_latest_score() {
        let engine = recording();
        let mut rx = engine.subscribe();

        engine.ingest(&gray(100).view());
        engine.ingest(&gray(110).view());

        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let snap = *rx.borrow_and_update();
        assert!((snap.last_score - 10.0).abs() < 1e-6);
        assert!(snap.motion_detected);
    }

    #[tokio::test]
    async fn slow_subscriber_only_sees_newest() {
        let engine = recording();
        let mut rx = engine.subscribe();

        for v in [100, 110, 130, 131] {
            engine.ingest(&gray(v).view());
        }

        rx.changed().await.unwrap();
        let snap = *rx.borrow_and_update();
        assert_eq!(snap.frames_scored, 3);
        assert!((snap.last_score - 1.0).abs() < 1e-6);
        assert!(!snap.motion_detected);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn discarded_frames_publish_nothing() {
        let engine = SharedEngine::new(&EngineConfig::default());
        let rx = engine.subscribe();
        assert_eq!(engine.ingest(&gray(1).view()), Ingest::Discarded);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn control_calls_from_another_thread() {
        let engine = recording();
        engine.ingest(&gray(100).view());

        let control = engine.clone();
        std::thread::spawn(move || {
            assert!(control.capture_original_reference());
            control.set_baseline(0.0);
        })
        .join()
        .unwrap();

        engine.ingest(&gray(100).view());
        engine.ingest(&gray(140).view());
        assert!((engine.snapshot().last_score - 40.0).abs() < 1e-6);
        assert!(engine.with_engine(|e| e.has_original()));
    }
}
