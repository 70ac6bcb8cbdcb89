//! Luminance-difference motion detection over raw BGRA camera frames.

pub mod engine;
pub mod luma;
pub mod shared;
pub mod snapshot;
pub mod source;

pub use engine::FrameDiffEngine;
pub use shared::SharedEngine;
pub use snapshot::{Ingest, MotionSnapshot};
pub use source::FrameSource;
