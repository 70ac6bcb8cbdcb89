use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use frame_motion_detector::{FrameSource, Ingest, SharedEngine};
use tracing::{debug, error, info, trace};

/// Pull frames from `source` at `fps` and feed them to the engine.
///
/// Runs on a blocking worker. Frames are handed over one at a time and
/// never queued: if ingest falls behind, the next tick simply renders a
/// newer frame. Returns the number of frames pulled.
pub fn run_capture_loop(
    mut source: Box<dyn FrameSource>,
    engine: SharedEngine,
    fps: f64,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    let interval = match Duration::try_from_secs_f64(1.0 / fps) {
        Ok(interval) => interval,
        Err(e) => {
            error!(fps, error = %e, "unusable capture rate, capture loop not started");
            return 0;
        }
    };
    let mut seq: u64 = 0;

    info!(source = source.name(), fps, "capture loop started");

    while !shutdown.load(Ordering::Relaxed) {
        let tick = Instant::now();

        let Some(frame) = source.next_frame() else {
            info!(source = source.name(), seq, "source exhausted");
            break;
        };
        let captured_at_ms = Utc::now().timestamp_millis();

        match engine.ingest(&frame.view()) {
            Ingest::Discarded => trace!(seq, "not recording, frame dropped"),
            Ingest::Observed(_) => debug!(seq, captured_at_ms, "first frame of session observed"),
            Ingest::Scored(snapshot) => trace!(
                seq,
                captured_at_ms,
                score = snapshot.last_score,
                "frame scored"
            ),
        }

        seq += 1;
        if seq % 100 == 0 {
            debug!(seq, "frames captured");
        }

        if let Some(remaining) = interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    info!(frames = seq, "capture loop stopped");
    seq
}
