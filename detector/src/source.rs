use frame_motion_common::frame::Frame;

/// Capture-side interface that feeds the engine.
///
/// Implementations wrap whatever delivers pixels (a camera session, a
/// synthetic generator) and hand frames out one at a time. The caller pulls
/// strictly serially, so implementations need no internal locking.
pub trait FrameSource: Send {
    /// Returns the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
